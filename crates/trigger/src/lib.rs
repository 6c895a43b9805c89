//! GifCap Trigger
//!
//! Owns the single process-wide global shortcut and turns presses into
//! actions. What a press means depends on whether a recording is live:
//!
//! - **Idle:** open the region-selection flow
//! - **Recording:** ask the surface that owns the recording to stop it
//!
//! The recording flag is read from the capture session's published state
//! when one is attached, so there is a single writer for it.

pub mod backend;
pub mod controller;
pub mod shortcut;

pub use backend::{GlobalHotkeyBackend, HotkeyBackend, HotkeyPressed, NullHotkeyBackend};
pub use controller::{TriggerAction, TriggerController, DEFAULT_OWNER};
pub use shortcut::Shortcut;
