//! GifCap Transcode
//!
//! Turns a raw WebM capture into an indexed-color GIF. The work happens in
//! a subordinate ffmpeg process driven by a filter graph:
//!
//! ```text
//! crop ─► fps ─► scale? ─► split ─┬─► palettegen ─┐
//!                                 └───────────────┴─► paletteuse ─► GIF
//! ```
//!
//! The encoder binary is located through an ordered list of strategies
//! and supervised with a timeout; a failed, timed-out, or cancelled run
//! leaves no partial output behind.

pub mod encoder;
pub mod filter_graph;
pub mod pipeline;
pub mod probe;
pub mod resolver;

pub use encoder::{TranscodeProgress, STDERR_TAIL_BYTES};
pub use filter_graph::{FilterGraph, FilterStage};
pub use pipeline::{encoder_args, transcode, transcode_with, TranscodeOptions};
pub use resolver::{EncoderResolver, ResolveStrategy};
