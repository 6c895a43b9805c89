//! Shortcut-driven loops.
//!
//! ```text
//! press ─▶ Host::press ─▶ TriggerController ─▶ TriggerAction
//!                                                  │
//!            OpenSelection ─▶ selector ─▶ Recorder::record ─┐
//!            StopRecording(own) ─▶ stop signal ─────────────┘
//!            StopRecording(other) ─▶ HostEvent::StopRecording
//! ```

use std::sync::Arc;

use gifcap_common::error::GifcapResult;
use gifcap_model::HostEvent;
use gifcap_trigger::{HotkeyPressed, TriggerAction};
use tokio::sync::{mpsc, oneshot, watch};

use crate::host::Host;
use crate::recorder::Recorder;
use crate::selector::{RegionSelector, SelectionOutcome};

/// Channels feeding a trigger loop.
pub struct TriggerInputs {
    pub presses: mpsc::UnboundedReceiver<HotkeyPressed>,
    pub actions: mpsc::UnboundedReceiver<TriggerAction>,
    /// Flips to `true` to stop the loop. A dropped sender also stops it.
    pub shutdown: watch::Receiver<bool>,
}

/// Select, record, and save in-process until shutdown.
///
/// A recording in progress at shutdown is stopped and saved before
/// returning.
pub async fn run_daemon(
    host: Arc<Host>,
    recorder: Recorder,
    selector: Arc<dyn RegionSelector>,
    mut inputs: TriggerInputs,
) -> GifcapResult<()> {
    tracing::info!(selector = selector.name(), owner = recorder.owner(), "Daemon running");

    loop {
        tokio::select! {
            _ = shutdown_requested(&mut inputs.shutdown) => break,
            Some(HotkeyPressed) = inputs.presses.recv() => {
                host.press().await;
            }
            Some(action) = inputs.actions.recv() => match action {
                TriggerAction::OpenSelection => {
                    if !select_and_record(&host, &recorder, selector.as_ref(), &mut inputs).await {
                        break;
                    }
                }
                TriggerAction::StopRecording { owner } if owner == recorder.owner() => {
                    tracing::debug!("Stop requested with no recording in progress");
                }
                TriggerAction::StopRecording { owner } => {
                    host.emit(HostEvent::StopRecording { owner });
                }
            },
        }
    }

    tracing::info!("Daemon stopping");
    host.shutdown().await;
    Ok(())
}

/// Returns `false` when shutdown was requested meanwhile.
async fn select_and_record(
    host: &Host,
    recorder: &Recorder,
    selector: &dyn RegionSelector,
    inputs: &mut TriggerInputs,
) -> bool {
    let outcome = tokio::select! {
        _ = shutdown_requested(&mut inputs.shutdown) => return false,
        outcome = selector.select() => outcome,
    };

    let region = match outcome {
        Ok(SelectionOutcome::Confirmed(region)) => {
            tracing::info!(%region, "Region confirmed");
            region
        }
        Ok(SelectionOutcome::Cancelled) => {
            tracing::info!("Selection cancelled");
            return true;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Region selection failed");
            return true;
        }
    };

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut stop_tx = Some(stop_tx);
    let recording = recorder.record(Some(region), async move {
        let _ = stop_rx.await;
    });
    tokio::pin!(recording);

    let mut keep_running = true;
    let result = loop {
        tokio::select! {
            result = &mut recording => break result,
            _ = shutdown_requested(&mut inputs.shutdown), if keep_running => {
                tracing::info!("Shutdown requested; finishing recording");
                keep_running = false;
                if let Some(tx) = stop_tx.take() {
                    let _ = tx.send(());
                }
            }
            Some(HotkeyPressed) = inputs.presses.recv() => {
                host.press().await;
            }
            Some(action) = inputs.actions.recv() => match action {
                TriggerAction::StopRecording { owner } if owner == recorder.owner() => {
                    if let Some(tx) = stop_tx.take() {
                        let _ = tx.send(());
                    }
                }
                TriggerAction::StopRecording { owner } => {
                    host.emit(HostEvent::StopRecording { owner });
                }
                TriggerAction::OpenSelection => {
                    tracing::debug!("Selection ignored while recording");
                }
            },
        }
    };

    match result {
        Ok(path) => tracing::info!(path = %path.display(), "Recording complete"),
        Err(e) => tracing::warn!(error = %e, "Recording not saved"),
    }
    keep_running
}

/// Forward trigger actions to a connected UI surface, which owns
/// selection and capture.
pub async fn run_ui_trigger_bridge(host: Arc<Host>, mut inputs: TriggerInputs) {
    loop {
        tokio::select! {
            _ = shutdown_requested(&mut inputs.shutdown) => break,
            Some(HotkeyPressed) = inputs.presses.recv() => {
                host.press().await;
            }
            Some(action) = inputs.actions.recv() => match action {
                TriggerAction::OpenSelection => host.emit(HostEvent::StartSelection),
                TriggerAction::StopRecording { owner } => {
                    host.emit(HostEvent::StopRecording { owner });
                }
            },
        }
    }
    tracing::debug!("Trigger bridge stopped");
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
