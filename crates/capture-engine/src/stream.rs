//! Seams between the session and a concrete capture backend.

use gifcap_common::error::GifcapResult;
use gifcap_model::Resolution;
use gifcap_platform_core::ScreenSource;

/// Result of asking a stream for newly encoded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPoll {
    /// Encoded bytes produced since the previous poll.
    Data(Vec<u8>),
    /// Nothing new yet.
    Pending,
    /// The stream ended on its own.
    Ended,
}

/// A live, encoding screen stream.
pub trait MediaStream: Send {
    /// Resolution the stream actually negotiated, which may differ from
    /// the one requested.
    fn resolution(&self) -> Resolution;

    /// Pull whatever the encoder has produced since the last call.
    fn poll_chunk(&mut self) -> GifcapResult<StreamPoll>;

    /// Stop producing frames and drain the encoder's trailing output.
    fn finish(&mut self) -> GifcapResult<Vec<Vec<u8>>>;

    /// Release the underlying capture resources. Must tolerate repeated
    /// calls.
    fn release(&mut self);
}

/// Enumerates capturable screens and opens streams on them.
pub trait ScreenSourceProvider: Send + Sync {
    fn sources(&self) -> GifcapResult<Vec<ScreenSource>>;

    fn open(
        &self,
        source: &ScreenSource,
        requested: Resolution,
    ) -> GifcapResult<Box<dyn MediaStream>>;
}
