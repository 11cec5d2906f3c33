mod backend_bridge;
mod config;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;

use crate::backend_bridge::commands::BackendCommand;
use crate::config::Cli;
use crate::controller::events::UiEvent;
use crate::ui::app::CounterApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let settings = config::load_settings(&cli);
    tracing::info!(database_url = %settings.database_url, "starting tally desktop gui");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Tally")
            .with_inner_size([420.0, 360.0])
            .with_min_inner_size([320.0, 280.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Tally",
        options,
        Box::new(|_cc| Ok(Box::new(CounterApp::new(cmd_tx, ui_rx)))),
    )
}
