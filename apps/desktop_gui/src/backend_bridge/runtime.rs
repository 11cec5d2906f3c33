//! Backend worker: owns the tokio runtime, the store, and the controller.

use std::{sync::Arc, thread};

use counter_core::{CounterController, CounterEvent};
use crossbeam_channel::{Receiver, Sender};
use storage::Storage;
use tokio::sync::broadcast;

use crate::backend_bridge::commands::BackendCommand;
use crate::config::Settings;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                    UiErrorContext::BackendStartup,
                    format!("failed to build backend runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run(settings, cmd_rx, ui_tx));
    });
}

async fn run(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    let store = match Storage::new(&settings.database_url).await {
        Ok(store) => store,
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                UiErrorContext::BackendStartup,
                format!(
                    "could not open counter store at '{}': {err:#}",
                    settings.database_url
                ),
            )));
            tracing::error!(
                "could not open counter store at '{}': {err:#}",
                settings.database_url
            );
            return;
        }
    };

    if let Err(err) = store.health_check().await {
        let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
            UiErrorContext::BackendStartup,
            format!("counter store failed its liveness probe: {err:#}"),
        )));
        tracing::error!("counter store failed its liveness probe: {err:#}");
        return;
    }

    let controller = CounterController::new(Arc::new(store));
    forward_value_changes(&controller, ui_tx.clone());
    forward_persistence_events(&controller, ui_tx.clone());

    match controller.initialize().await {
        Ok(value) => {
            tracing::info!(value, "counter loaded");
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));
        }
        Err(err) => {
            tracing::error!("counter load failed: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                UiErrorContext::LoadCounter,
                err.to_string(),
            )));
        }
    }

    while let Ok(cmd) = cmd_rx.recv() {
        tracing::debug!(command = cmd.name(), "servicing ui->backend command");
        match cmd {
            BackendCommand::Increment => controller.increment(),
            BackendCommand::Reset => controller.reset(),
        }
    }
}

fn forward_value_changes(controller: &CounterController, ui_tx: Sender<UiEvent>) {
    let mut value_rx = controller.subscribe_value();
    tokio::spawn(async move {
        while value_rx.changed().await.is_ok() {
            let current = *value_rx.borrow_and_update();
            if let Some(value) = current {
                let _ = ui_tx.try_send(UiEvent::CounterChanged(value));
            }
        }
    });
}

fn forward_persistence_events(controller: &CounterController, ui_tx: Sender<UiEvent>) {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CounterEvent::Persisted { value }) => {
                    let _ = ui_tx.try_send(UiEvent::CounterPersisted(value));
                }
                Ok(CounterEvent::WriteFailed { value, reason }) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                        UiErrorContext::Persistence,
                        format!("failed to persist counter value {value}: {reason}"),
                    )));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
