//! Trigger dispatch.

use gifcap_common::error::GifcapResult;
use gifcap_model::SessionState;
use tokio::sync::{mpsc, watch};

use crate::backend::HotkeyBackend;
use crate::shortcut::Shortcut;

/// Owner used when no surface has claimed the recording.
pub const DEFAULT_OWNER: &str = "main";

/// What a trigger press asks the rest of the system to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    OpenSelection,
    StopRecording { owner: String },
}

/// Where the recording flag comes from.
enum RecordingSource {
    /// Follows the capture session's published state.
    Session(watch::Receiver<SessionState>),
    /// Set by explicit notifications from a UI surface.
    Notified(bool),
}

/// Owns the active shortcut and maps presses to [`TriggerAction`]s.
pub struct TriggerController {
    backend: Box<dyn HotkeyBackend>,
    active: Option<Shortcut>,
    recording: RecordingSource,
    owner: String,
    actions: mpsc::UnboundedSender<TriggerAction>,
}

impl TriggerController {
    pub fn new(
        backend: Box<dyn HotkeyBackend>,
        actions: mpsc::UnboundedSender<TriggerAction>,
    ) -> Self {
        Self {
            backend,
            active: None,
            recording: RecordingSource::Notified(false),
            owner: DEFAULT_OWNER.to_string(),
            actions,
        }
    }

    /// Derive the recording flag from a capture session's state channel.
    /// Explicit notifications are ignored afterwards.
    pub fn with_session_state(mut self, state: watch::Receiver<SessionState>) -> Self {
        self.recording = RecordingSource::Session(state);
        self
    }

    /// Register `combination`, replacing any active one.
    ///
    /// The previous combination is released first, so a failure leaves
    /// no shortcut active.
    pub fn register(&mut self, combination: &str) -> GifcapResult<()> {
        let shortcut: Shortcut = combination.parse()?;
        if self.active.as_ref() == Some(&shortcut) {
            return Ok(());
        }

        if !shortcut.has_modifiers() {
            tracing::warn!(%shortcut, "Shortcut has no modifiers; the key is captured system-wide");
        }

        self.unregister();
        match self.backend.register(&shortcut) {
            Ok(()) => {
                tracing::info!(%shortcut, backend = self.backend.name(), "Shortcut registered");
                self.active = Some(shortcut);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%shortcut, error = %e, "Shortcut registration failed");
                Err(e)
            }
        }
    }

    /// Release the active combination, if any.
    pub fn unregister(&mut self) {
        if let Some(shortcut) = self.active.take() {
            match self.backend.unregister(&shortcut) {
                Ok(()) => tracing::info!(%shortcut, "Shortcut unregistered"),
                Err(e) => tracing::warn!(%shortcut, error = %e, "Failed to unregister shortcut"),
            }
        }
    }

    pub fn active_shortcut(&self) -> Option<&Shortcut> {
        self.active.as_ref()
    }

    /// Record a UI-side capture starting or stopping.
    pub fn set_recording_state(&mut self, recording: bool) {
        match &mut self.recording {
            RecordingSource::Notified(flag) => {
                tracing::debug!(recording, "Recording state notified");
                *flag = recording;
            }
            RecordingSource::Session(_) => {
                tracing::debug!(recording, "Ignoring recording notification; state is derived");
            }
        }
    }

    /// The surface that receives stop requests.
    pub fn set_recording_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
    }

    pub fn is_recording(&self) -> bool {
        match &self.recording {
            RecordingSource::Session(state) => state.borrow().is_active(),
            RecordingSource::Notified(flag) => *flag,
        }
    }

    /// Handle one press of the shortcut.
    pub fn trigger(&self) -> TriggerAction {
        let action = if self.is_recording() {
            TriggerAction::StopRecording {
                owner: self.owner.clone(),
            }
        } else {
            TriggerAction::OpenSelection
        };
        tracing::debug!(?action, "Shortcut triggered");
        if self.actions.send(action.clone()).is_err() {
            tracing::warn!("Trigger action dropped; no receiver");
        }
        action
    }
}

impl Drop for TriggerController {
    fn drop(&mut self) {
        self.unregister();
    }
}
