//! GifCap Model
//!
//! Defines the data contracts shared by the capture, transcode, and host
//! crates:
//! - **Region:** the selected rectangle, in source-pixel coordinates
//! - **Encode:** per-invocation encode settings and transcode jobs
//! - **Artifact:** metadata for saved output files
//! - **Protocol:** messages exchanged between the host and a UI surface
//! - **Payload:** the base64 video payload contract for that boundary
//! - **Session:** capture lifecycle states observed by the trigger

pub mod artifact;
pub mod encode;
pub mod payload;
pub mod protocol;
pub mod region;
pub mod session;

pub use artifact::*;
pub use encode::*;
pub use payload::*;
pub use protocol::*;
pub use region::*;
pub use session::*;
