//! GifCap Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **Display Detection:** display server and monitor enumeration
//! - **Permissions:** capability detection and user guidance

pub mod display;
pub mod permissions;

pub use display::*;
