//! Counter screen and the paint-loop side of the backend bridge.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiErrorContext, UiEvent};

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

pub struct CounterApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    count: Option<u64>,
    last_persisted: Option<u64>,
    status: String,
    status_banner: Option<StatusBanner>,
    backend_failed: bool,
}

impl CounterApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            count: None,
            last_persisted: None,
            status: "Loading counter...".to_string(),
            status_banner: None,
            backend_failed: false,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::CounterChanged(value) => {
                    self.count = Some(value);
                }
                UiEvent::CounterPersisted(value) => {
                    self.last_persisted = Some(value);
                }
                UiEvent::Error(err) => {
                    if err.context == UiErrorContext::BackendStartup {
                        self.backend_failed = true;
                    }
                    self.status = format!("{} error: {}", err.context.label(), err.message);
                    self.status_banner = Some(StatusBanner {
                        message: self.status.clone(),
                    });
                }
            }
        }
    }

    fn count_label(&self) -> String {
        match self.count {
            Some(value) => value.to_string(),
            None => "…".to_string(),
        }
    }

    fn increment_clicked(&mut self) {
        queue_command(&self.cmd_tx, BackendCommand::Increment, &mut self.status);
    }

    fn reset_clicked(&mut self) {
        queue_command(&self.cmd_tx, BackendCommand::Reset, &mut self.status);
    }

    fn show_counter_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(20.0);
            ui.vertical_centered(|ui| {
                ui.heading("Tally");
                ui.add_space(8.0);

                if let Some(banner) = self.status_banner.clone() {
                    ui.label(
                        egui::RichText::new(&banner.message)
                            .color(egui::Color32::from_rgb(222, 110, 110)),
                    );
                    if ui.small_button("Dismiss").clicked() {
                        self.status_banner = None;
                    }
                    ui.add_space(8.0);
                }

                ui.label(egui::RichText::new(self.count_label()).size(56.0).strong());
                ui.add_space(16.0);

                let loaded = self.count.is_some();
                ui.horizontal(|ui| {
                    let row_width = 220.0;
                    ui.add_space((ui.available_width() - row_width).max(0.0) / 2.0);

                    let increment = ui.add_enabled(
                        loaded && !self.backend_failed,
                        egui::Button::new("Increment").min_size(egui::vec2(110.0, 36.0)),
                    );
                    if increment.clicked() {
                        self.increment_clicked();
                    }

                    // Reset stays available after a load failure so a corrupt
                    // slot can be overwritten from the UI.
                    let reset = ui.add_enabled(
                        !self.backend_failed,
                        egui::Button::new("Reset").min_size(egui::vec2(100.0, 36.0)),
                    );
                    if reset.clicked() {
                        self.reset_clicked();
                    }
                });

                ui.add_space(16.0);
                ui.separator();
                ui.horizontal_wrapped(|ui| {
                    ui.small("Status:");
                    ui.small(egui::RichText::new(&self.status).weak());
                });
                if let Some(persisted) = self.last_persisted {
                    ui.small(format!("Last saved value: {persisted}"));
                }
            });
        });
    }
}

impl eframe::App for CounterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.show_counter_screen(ctx);
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn queue_command(cmd_tx: &Sender<BackendCommand>, cmd: BackendCommand, status: &mut String) {
    let cmd_name = cmd.name();
    tracing::debug!(command = cmd_name, "queueing ui->backend command");
    match cmd_tx.try_send(cmd) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            *status = "Command queue is full; please retry".to_string();
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker is gone; restart the app".to_string();
            tracing::error!(command = cmd_name, "ui->backend command queue disconnected");
        }
    }
}
