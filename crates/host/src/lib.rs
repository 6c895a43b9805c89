//! # gifcap-host
//!
//! The privileged side of GifCap. UI surfaces never touch the
//! filesystem, the encoder, or the global shortcut directly; they send
//! [`HostRequest`](gifcap_model::HostRequest)s and receive
//! [`HostEvent`](gifcap_model::HostEvent)s.
//!
//! - [`Host`]: request dispatch, config, save-recording flow
//! - [`Recorder`]: in-process capture from start to saved GIF
//! - [`RegionSelector`]: interactive or fixed region selection
//! - [`run_daemon`] / [`run_ui_trigger_bridge`]: shortcut-driven loops
//! - [`transport::serve`]: line-delimited JSON over any byte stream

pub mod daemon;
pub mod host;
pub mod recorder;
pub mod selector;
pub mod transport;

#[cfg(test)]
mod testing;

pub use daemon::{run_daemon, run_ui_trigger_bridge, TriggerInputs};
pub use host::Host;
pub use recorder::{to_capture_space, Recorder, RECORDER_OWNER};
pub use selector::{FixedRegionSelector, RegionSelector, SelectionOutcome, SlopSelector, UiSelector};
