//! One recording from capture start to saved artifact.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use gifcap_capture::{CaptureSession, ScreenSourceProvider, SessionStatus};
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::{HostEvent, Region, Resolution};
use gifcap_platform_core::MonitorInfo;

use crate::host::Host;

/// Owner name the recorder registers with the trigger controller.
pub const RECORDER_OWNER: &str = "daemon";

/// Drives capture sessions inside the host process.
pub struct Recorder {
    host: Arc<Host>,
    provider: Arc<dyn ScreenSourceProvider>,
    status: SessionStatus,
    owner: String,
}

impl Recorder {
    pub fn new(
        host: Arc<Host>,
        provider: Arc<dyn ScreenSourceProvider>,
        status: SessionStatus,
    ) -> Self {
        Self {
            host,
            provider,
            status,
            owner: RECORDER_OWNER.to_string(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// State channel shared with the trigger controller.
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_recording(&self) -> bool {
        self.status.current().is_active()
    }

    /// Capture until `stop` resolves, then transcode and save.
    ///
    /// `region` is in screen coordinates, as a selector reports it.
    pub async fn record<F>(&self, region: Option<Region>, stop: F) -> GifcapResult<PathBuf>
    where
        F: Future<Output = ()>,
    {
        if self.is_recording() {
            return Err(GifcapError::stream("a recording is already in progress"));
        }

        let provider = self.provider.clone();
        let status = self.status.clone();
        let started = tokio::task::spawn_blocking(move || {
            CaptureSession::start(provider.as_ref(), status)
        })
        .await
        .map_err(|e| GifcapError::stream(format!("capture start task failed: {e}")))
        .and_then(|started| started);
        let mut session = match started {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e)),
        };

        self.host.set_recording_owner(&self.owner).await;
        self.host.emit(HostEvent::RecordingStarted {
            owner: self.owner.clone(),
        });

        let monitor = session.source().monitor.clone();
        let blob = session.run_until(stop).await;
        session.cleanup();

        let Some(blob) = blob else {
            return Err(self.fail(GifcapError::stream("capture stopped without producing data")));
        };

        let region = match region
            .map(|r| to_capture_space(r, &monitor, blob.resolution))
            .transpose()
        {
            Ok(region) => region,
            Err(e) => return Err(self.fail(e)),
        };

        self.host
            .save_blob(&blob.data, region, Some(blob.resolution))
            .await
    }

    fn fail(&self, error: GifcapError) -> GifcapError {
        tracing::warn!(error = %error, "Recording failed");
        self.host.emit(HostEvent::RecordingFailed {
            error: error.to_string(),
        });
        error
    }
}

/// Convert a screen-space region to pixel coordinates of a capture of
/// `monitor` negotiated at `capture`.
pub fn to_capture_space(
    region: Region,
    monitor: &MonitorInfo,
    capture: Resolution,
) -> GifcapResult<Region> {
    let left = i64::from(region.x) - i64::from(monitor.x);
    let top = i64::from(region.y) - i64::from(monitor.y);
    let fits = left >= 0
        && top >= 0
        && left + i64::from(region.width) <= i64::from(monitor.width)
        && top + i64::from(region.height) <= i64::from(monitor.height);
    if !fits {
        return Err(GifcapError::invalid_region(format!(
            "region {region} is outside screen {} ({}x{}+{}+{})",
            monitor.name, monitor.width, monitor.height, monitor.x, monitor.y
        )));
    }

    let local = Region::new(left as u32, top as u32, region.width, region.height)?;
    Ok(local.map_between(Resolution::new(monitor.width, monitor.height), capture))
}
