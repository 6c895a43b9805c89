//! Capture session lifecycle states.

use serde::{Deserialize, Serialize};

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No capture in progress.
    #[default]
    Idle,
    /// The stream is open and chunks are accumulating.
    Capturing,
    /// Stop was requested; trailing data is being drained.
    Finalizing,
    /// The blob has been materialized.
    Complete,
    /// Capture ended without producing any data.
    Failed,
}

impl SessionState {
    /// A recording is in flight: a trigger should stop it rather than
    /// start a new selection.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Capturing | SessionState::Finalizing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_capturing_and_finalizing_are_active() {
        assert!(SessionState::Capturing.is_active());
        assert!(SessionState::Finalizing.is_active());
        assert!(!SessionState::Idle.is_active());
        assert!(!SessionState::Complete.is_active());
        assert!(!SessionState::Failed.is_active());
    }
}
