//! GifCap Capture Engine
//!
//! Acquires a live screen stream and accumulates its encoded output into
//! an in-memory blob. A session owns the stream from `start` until the
//! blob is materialized, and releases it exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  open   ┌─────────────────────────┐
//! │ ScreenSourceProvider │ ──────► │ MediaStream             │
//! │ (GstScreenProvider)  │         │ ximagesrc ► vp8 ► webm  │
//! └──────────────────────┘         └───────────┬─────────────┘
//!                                              │ poll every 100ms
//!                                              ▼
//!                                  ┌─────────────────────────┐
//!                                  │ CaptureSession          │
//!                                  │ ordered chunks ► blob   │
//!                                  └───────────┬─────────────┘
//!                                              │ SessionState
//!                                              ▼
//!                                        SessionStatus (watch)
//! ```

pub mod pipeline;
pub mod session;
pub mod stream;

pub use pipeline::GstScreenProvider;
pub use session::*;
pub use stream::*;
