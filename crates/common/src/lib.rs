//! GifCap Common Utilities
//!
//! Shared infrastructure for all GifCap crates:
//! - Error taxonomy and result alias
//! - Recording clock and artifact timestamps
//! - Tracing/logging initialization
//! - Persisted configuration store

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
