pub mod artifacts;
pub mod check;
pub mod config;
pub mod daemon;
pub mod record;
pub mod serve;
pub mod transcode;

use gifcap_host::TriggerInputs;
use gifcap_model::{HostEvent, SessionState};
use gifcap_trigger::{
    GlobalHotkeyBackend, HotkeyBackend, NullHotkeyBackend, TriggerController,
};
use tokio::sync::{broadcast, mpsc, watch};

/// A trigger controller wired to the loop that consumes its output.
pub struct TriggerSetup {
    pub controller: TriggerController,
    pub inputs: TriggerInputs,
    pub shutdown: watch::Sender<bool>,
}

/// Start the system shortcut listener. Without one, the controller
/// runs on the null backend and registration fails.
pub fn trigger_setup(state: Option<watch::Receiver<SessionState>>) -> TriggerSetup {
    let (press_tx, presses) = mpsc::unbounded_channel();
    let (action_tx, actions) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = watch::channel(false);

    let backend: Box<dyn HotkeyBackend> = match GlobalHotkeyBackend::start(press_tx) {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            tracing::warn!(error = %e, "Global shortcuts unavailable");
            Box::new(NullHotkeyBackend)
        }
    };

    let mut controller = TriggerController::new(backend, action_tx);
    if let Some(state) = state {
        controller = controller.with_session_state(state);
    }

    TriggerSetup {
        controller,
        inputs: TriggerInputs {
            presses,
            actions,
            shutdown: shutdown_rx,
        },
        shutdown,
    }
}

/// Flip `shutdown` on Ctrl+C.
pub fn shutdown_on_ctrl_c(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
            return;
        }
        println!();
        let _ = shutdown.send(true);
    });
}

/// Print recording outcomes as they happen.
pub fn print_outcomes(mut events: broadcast::Receiver<HostEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(HostEvent::RecordingStarted { .. }) => println!("Recording..."),
                Ok(HostEvent::RecordingSaved { path }) => println!("Saved {}", path.display()),
                Ok(HostEvent::RecordingFailed { error }) => println!("Recording failed: {error}"),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
