//! Capture session lifecycle.
//!
//! A session moves `Capturing -> Finalizing -> Complete` (or `Failed` when
//! nothing was recorded). Every transition is published on a shared
//! [`SessionStatus`] so the trigger can tell whether a recording is live
//! without keeping its own flag.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gifcap_common::clock::RecordingClock;
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::{Resolution, SessionState};
use gifcap_platform_core::ScreenSource;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::stream::{MediaStream, ScreenSourceProvider, StreamPoll};

/// How often the session pulls encoded data from the stream.
pub const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Shared publisher of the current capture state.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStatus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    fn publish(&self, state: SessionState) {
        self.tx.send_replace(state);
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// The materialized recording.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedBlob {
    /// Encoded container bytes, in production order.
    pub data: Vec<u8>,

    /// Resolution the stream negotiated.
    pub resolution: Resolution,

    pub chunk_count: usize,

    pub duration_secs: f64,

    /// The stream failed and this holds what was captured before it did.
    pub salvaged: bool,
}

impl FinalizedBlob {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of one poll of the stream.
enum Pulled {
    Continue,
    /// The stream ended or failed; the session should stop.
    Done,
}

/// A single recording from stream acquisition to blob.
pub struct CaptureSession {
    source: ScreenSource,
    stream: Option<Box<dyn MediaStream>>,
    resolution: Resolution,
    chunks: Vec<Vec<u8>>,
    state: SessionState,
    status: SessionStatus,
    clock: RecordingClock,
    duration_secs: f64,
    salvaged: bool,
}

impl CaptureSession {
    /// Acquire the first available screen and start capturing it.
    ///
    /// The stream is requested at the screen's logical size; the size it
    /// actually negotiates is available from [`CaptureSession::resolution`].
    pub fn start(provider: &dyn ScreenSourceProvider, status: SessionStatus) -> GifcapResult<Self> {
        let source = provider
            .sources()?
            .into_iter()
            .next()
            .ok_or(GifcapError::NoSourceAvailable)?;

        let requested = Resolution::new(
            source.monitor.logical_width(),
            source.monitor.logical_height(),
        );
        tracing::info!(
            source = %source.id,
            name = %source.name,
            %requested,
            "Starting capture session"
        );

        let stream = provider.open(&source, requested)?;
        let resolution = stream.resolution();
        if resolution != requested {
            tracing::info!(
                %requested,
                negotiated = %resolution,
                "Capture resolution differs from request"
            );
        }

        let clock = RecordingClock::start();
        tracing::info!(epoch_wall = %clock.epoch_wall(), "Recording clock started");

        status.publish(SessionState::Capturing);
        Ok(Self {
            source,
            stream: Some(stream),
            resolution,
            chunks: Vec::new(),
            state: SessionState::Capturing,
            status,
            clock,
            duration_secs: 0.0,
            salvaged: false,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Negotiated capture resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn source(&self) -> &ScreenSource {
        &self.source
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Recording duration so far.
    pub fn elapsed_secs(&self) -> f64 {
        if self.state.is_active() {
            self.clock.elapsed_secs()
        } else {
            self.duration_secs
        }
    }

    /// Pull one round of data from the stream.
    ///
    /// Returns the blob when the stream ended or failed during this poll.
    /// A failing stream is stopped and whatever was already captured is
    /// kept.
    pub fn poll(&mut self) -> Option<FinalizedBlob> {
        match self.pull() {
            Pulled::Continue => None,
            Pulled::Done => self.stop(),
        }
    }

    fn pull(&mut self) -> Pulled {
        if self.state != SessionState::Capturing {
            return Pulled::Continue;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Pulled::Continue;
        };

        match stream.poll_chunk() {
            Ok(StreamPoll::Data(bytes)) => {
                self.push_chunk(bytes);
                Pulled::Continue
            }
            Ok(StreamPoll::Pending) => Pulled::Continue,
            Ok(StreamPoll::Ended) => {
                tracing::info!("Capture stream ended");
                Pulled::Done
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    chunks = self.chunks.len(),
                    "Capture stream failed; keeping recorded data"
                );
                self.salvaged = true;
                Pulled::Done
            }
        }
    }

    /// Poll at [`CHUNK_INTERVAL`] until `stop` resolves or the stream
    /// finishes by itself, then return the blob.
    ///
    /// The final drain runs on the blocking pool, so other tasks keep
    /// running while the encoder flushes.
    pub async fn run_until<F>(&mut self, stop: F) -> Option<FinalizedBlob>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut ticker = tokio::time::interval(CHUNK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => return self.stop_async().await,
                _ = ticker.tick() => {
                    match self.pull() {
                        Pulled::Done => return self.stop_async().await,
                        Pulled::Continue if self.state != SessionState::Capturing => return None,
                        Pulled::Continue => {}
                    }
                }
            }
        }
    }

    /// Stop capturing, drain the encoder, release the stream, and
    /// materialize the blob.
    ///
    /// Returns `None` when the session is no longer capturing. The drain
    /// blocks the calling thread; async callers use
    /// [`CaptureSession::stop_async`].
    pub fn stop(&mut self) -> Option<FinalizedBlob> {
        if !self.begin_stop() {
            return None;
        }
        if !self.salvaged {
            if let Some(stream) = self.stream.as_mut() {
                let tail = stream.finish();
                self.absorb_tail(tail);
            }
        }
        Some(self.complete())
    }

    /// [`CaptureSession::stop`] with the drain and release moved to the
    /// blocking pool.
    pub async fn stop_async(&mut self) -> Option<FinalizedBlob> {
        if !self.begin_stop() {
            return None;
        }
        if let Some(mut stream) = self.stream.take() {
            let drain = !self.salvaged;
            let drained = tokio::task::spawn_blocking(move || {
                let tail = drain.then(|| stream.finish());
                stream.release();
                tail
            })
            .await;
            tracing::debug!(source = %self.source.id, "Capture stream released");

            match drained {
                Ok(Some(tail)) => self.absorb_tail(tail),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Capture drain task failed");
                    self.salvaged = true;
                }
            }
        }
        Some(self.complete())
    }

    fn begin_stop(&mut self) -> bool {
        if self.state != SessionState::Capturing {
            tracing::debug!(state = ?self.state, "Stop ignored; session is not capturing");
            return false;
        }
        self.set_state(SessionState::Finalizing);
        true
    }

    fn absorb_tail(&mut self, tail: GifcapResult<Vec<Vec<u8>>>) {
        match tail {
            Ok(chunks) => {
                for chunk in chunks {
                    self.push_chunk(chunk);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to drain capture stream");
                self.salvaged = true;
            }
        }
    }

    fn complete(&mut self) -> FinalizedBlob {
        self.duration_secs = self.clock.elapsed_secs();
        self.release_stream();

        let blob = self.finalize();
        if blob.is_empty() {
            tracing::warn!("Capture produced no data");
            self.set_state(SessionState::Failed);
        } else {
            self.set_state(SessionState::Complete);
        }

        tracing::info!(
            bytes = blob.data.len(),
            chunks = blob.chunk_count,
            duration_secs = blob.duration_secs,
            salvaged = blob.salvaged,
            "Capture session stopped"
        );
        blob
    }

    /// Concatenate the accumulated chunks. Repeated calls yield the same
    /// bytes.
    pub fn finalize(&self) -> FinalizedBlob {
        FinalizedBlob {
            data: self.chunks.concat(),
            resolution: self.resolution,
            chunk_count: self.chunks.len(),
            duration_secs: self.duration_secs,
            salvaged: self.salvaged,
        }
    }

    /// Release the stream and drop buffered data.
    pub fn cleanup(&mut self) {
        self.release_stream();
        self.chunks.clear();
        self.set_state(SessionState::Idle);
    }

    fn push_chunk(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        tracing::trace!(bytes = chunk.len(), index = self.chunks.len(), "Captured chunk");
        self.chunks.push(chunk);
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            tracing::debug!(source = %self.source.id, "Capture stream released");
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.status.publish(state);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release_stream();
        if self.state.is_active() {
            self.set_state(SessionState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use gifcap_platform_core::MonitorInfo;
    use proptest::prelude::*;

    use super::*;

    struct FakeStream {
        resolution: Resolution,
        polls: VecDeque<GifcapResult<StreamPoll>>,
        tail: Vec<Vec<u8>>,
        finish_delay: Duration,
        released: Arc<AtomicUsize>,
    }

    impl MediaStream for FakeStream {
        fn resolution(&self) -> Resolution {
            self.resolution
        }

        fn poll_chunk(&mut self) -> GifcapResult<StreamPoll> {
            self.polls.pop_front().unwrap_or(Ok(StreamPoll::Pending))
        }

        fn finish(&mut self) -> GifcapResult<Vec<Vec<u8>>> {
            std::thread::sleep(self.finish_delay);
            Ok(std::mem::take(&mut self.tail))
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeProvider {
        sources: Vec<ScreenSource>,
        negotiated: Option<Resolution>,
        polls: Mutex<Option<VecDeque<GifcapResult<StreamPoll>>>>,
        tail: Vec<Vec<u8>>,
        finish_delay: Duration,
        requested: Mutex<Option<Resolution>>,
        released: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(polls: Vec<GifcapResult<StreamPoll>>, tail: Vec<Vec<u8>>) -> Self {
            Self {
                sources: ScreenSource::from_monitors(&[monitor()]),
                negotiated: None,
                polls: Mutex::new(Some(polls.into())),
                tail,
                finish_delay: Duration::ZERO,
                requested: Mutex::new(None),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl ScreenSourceProvider for FakeProvider {
        fn sources(&self) -> GifcapResult<Vec<ScreenSource>> {
            Ok(self.sources.clone())
        }

        fn open(
            &self,
            _source: &ScreenSource,
            requested: Resolution,
        ) -> GifcapResult<Box<dyn MediaStream>> {
            *self.requested.lock().unwrap() = Some(requested);
            Ok(Box::new(FakeStream {
                resolution: self.negotiated.unwrap_or(requested),
                polls: self.polls.lock().unwrap().take().unwrap_or_default(),
                tail: self.tail.clone(),
                finish_delay: self.finish_delay,
                released: self.released.clone(),
            }))
        }
    }

    fn monitor() -> MonitorInfo {
        MonitorInfo {
            name: "HDMI-1".into(),
            width: 2560,
            height: 1440,
            x: 0,
            y: 0,
            scale_factor: 1.0,
            primary: true,
        }
    }

    fn data(bytes: &[u8]) -> GifcapResult<StreamPoll> {
        Ok(StreamPoll::Data(bytes.to_vec()))
    }

    #[test]
    fn start_without_sources_fails() {
        let mut provider = FakeProvider::new(vec![], vec![]);
        provider.sources.clear();
        let status = SessionStatus::new();

        let err = CaptureSession::start(&provider, status.clone())
            .err()
            .unwrap();
        assert!(matches!(err, GifcapError::NoSourceAvailable));
        assert_eq!(status.current(), SessionState::Idle);
    }

    #[test]
    fn chunks_are_concatenated_in_order() {
        let provider = FakeProvider::new(
            vec![data(b"ab"), Ok(StreamPoll::Pending), data(b""), data(b"cd")],
            vec![b"ef".to_vec()],
        );
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();
        for _ in 0..4 {
            assert!(session.poll().is_none());
        }
        assert_eq!(session.chunk_count(), 2);

        let blob = session.stop().unwrap();
        assert_eq!(blob.data, b"abcdef");
        assert_eq!(blob.chunk_count, 3);
        assert!(!blob.salvaged);
        assert_eq!(session.state(), SessionState::Complete);
    }

    #[test]
    fn second_stop_is_a_no_op_and_release_happens_once() {
        let provider = FakeProvider::new(vec![data(b"frame")], vec![]);
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();
        session.poll();

        let first = session.stop().unwrap();
        assert!(session.stop().is_none());
        assert_eq!(session.finalize(), first);
        assert_eq!(session.finalize(), first);

        session.cleanup();
        drop(session);
        assert_eq!(provider.released(), 1);
    }

    #[test]
    fn stream_error_salvages_recorded_chunks() {
        let provider = FakeProvider::new(
            vec![
                data(b"one"),
                data(b"two"),
                Err(GifcapError::stream("device lost")),
            ],
            vec![b"never".to_vec()],
        );
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();
        assert!(session.poll().is_none());
        assert!(session.poll().is_none());

        let blob = session.poll().unwrap();
        assert_eq!(blob.data, b"onetwo");
        assert!(blob.salvaged);
        assert_eq!(session.state(), SessionState::Complete);
        assert!(session.stop().is_none());
        assert_eq!(provider.released(), 1);
    }

    #[test]
    fn stream_error_before_any_data_yields_empty_blob() {
        let provider = FakeProvider::new(vec![Err(GifcapError::stream("denied"))], vec![]);
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();

        let blob = session.poll().unwrap();
        assert!(blob.is_empty());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn negotiated_resolution_is_reported() {
        let mut provider = FakeProvider::new(vec![], vec![]);
        provider.negotiated = Some(Resolution::new(1280, 720));
        let session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();

        assert_eq!(
            *provider.requested.lock().unwrap(),
            Some(Resolution::new(2560, 1440))
        );
        assert_eq!(session.resolution(), Resolution::new(1280, 720));
    }

    #[test]
    fn status_follows_the_session() {
        let status = SessionStatus::new();
        let rx = status.subscribe();
        let provider = FakeProvider::new(vec![data(b"x")], vec![]);

        let mut session = CaptureSession::start(&provider, status.clone()).unwrap();
        assert_eq!(*rx.borrow(), SessionState::Capturing);
        assert!(status.current().is_active());

        session.poll();
        session.stop();
        assert_eq!(*rx.borrow(), SessionState::Complete);
        assert!(!status.current().is_active());
    }

    #[test]
    fn dropping_a_live_session_releases_and_resets_status() {
        let status = SessionStatus::new();
        let provider = FakeProvider::new(vec![], vec![]);
        let session = CaptureSession::start(&provider, status.clone()).unwrap();

        drop(session);
        assert_eq!(provider.released(), 1);
        assert_eq!(status.current(), SessionState::Idle);
    }

    #[tokio::test]
    async fn run_until_collects_until_stop_fires() {
        let provider = FakeProvider::new(
            vec![data(b"1"), data(b"2"), data(b"3")],
            vec![b"4".to_vec()],
        );
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();

        let blob = session
            .run_until(tokio::time::sleep(Duration::from_millis(450)))
            .await
            .unwrap();
        assert_eq!(blob.data, b"1234");
    }

    #[tokio::test]
    async fn run_until_returns_when_stream_ends() {
        let provider = FakeProvider::new(vec![data(b"a"), Ok(StreamPoll::Ended)], vec![]);
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();

        let blob = session
            .run_until(std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(blob.data, b"a");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn draining_leaves_the_runtime_free() {
        let mut provider = FakeProvider::new(vec![data(b"head")], vec![b"tail".to_vec()]);
        provider.finish_delay = Duration::from_millis(300);
        let status = SessionStatus::new();
        let mut session = CaptureSession::start(&provider, status.clone()).unwrap();
        assert!(session.poll().is_none());

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let blob = session.run_until(std::future::ready(())).await.unwrap();
        ticker.abort();

        assert_eq!(blob.data, b"headtail");
        assert!(ticks.load(Ordering::SeqCst) >= 5, "ticker starved during drain");
        assert_eq!(provider.released(), 1);
        assert_eq!(status.current(), SessionState::Complete);
        assert!(session.stop_async().await.is_none());
    }

    #[tokio::test]
    async fn stop_async_after_stream_error_skips_the_drain() {
        let provider = FakeProvider::new(
            vec![data(b"kept"), Err(GifcapError::stream("device lost"))],
            vec![b"never".to_vec()],
        );
        let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();

        let blob = session.run_until(std::future::pending::<()>()).await.unwrap();
        assert_eq!(blob.data, b"kept");
        assert!(blob.salvaged);
        assert_eq!(provider.released(), 1);
    }

    proptest! {
        #[test]
        fn blob_is_concatenation_of_non_empty_chunks(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..24)
        ) {
            let polls = chunks.iter().map(|c| Ok(StreamPoll::Data(c.clone()))).collect();
            let provider = FakeProvider::new(polls, vec![]);
            let mut session = CaptureSession::start(&provider, SessionStatus::new()).unwrap();
            for _ in 0..chunks.len() {
                session.poll();
            }
            let blob = session.stop().unwrap();

            prop_assert_eq!(blob.data, chunks.concat());
            prop_assert_eq!(blob.chunk_count, chunks.iter().filter(|c| !c.is_empty()).count());
        }
    }
}
