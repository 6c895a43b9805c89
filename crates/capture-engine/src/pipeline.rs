//! GStreamer-backed screen capture.
//!
//! The launch line grabs the screen with `ximagesrc`, scales to the
//! requested size, and encodes VP8 into a streamable WebM container that
//! an `appsink` hands back buffer by buffer.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::Resolution;
use gifcap_platform_core::ScreenSource;
use gifcap_platform_linux::{detect_display_server, detect_monitors, DisplayServer};
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;

use crate::stream::{MediaStream, ScreenSourceProvider, StreamPoll};

/// Frame rate the screen is sampled at before encoding.
pub const CAPTURE_FPS: u32 = 30;

const RAW_STAGE: &str = "raw";
const SINK: &str = "sink";
const CAPS_WAIT: Duration = Duration::from_secs(2);
const EOS_DRAIN: Duration = Duration::from_secs(5);

/// Opens `ximagesrc` streams on the monitors `xrandr` reports.
#[derive(Debug, Clone)]
pub struct GstScreenProvider {
    show_pointer: bool,
}

impl Default for GstScreenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GstScreenProvider {
    pub fn new() -> Self {
        Self { show_pointer: true }
    }

    pub fn with_pointer(mut self, show_pointer: bool) -> Self {
        self.show_pointer = show_pointer;
        self
    }
}

impl ScreenSourceProvider for GstScreenProvider {
    fn sources(&self) -> GifcapResult<Vec<ScreenSource>> {
        let display_server = detect_display_server();
        if display_server == DisplayServer::Unknown {
            tracing::warn!("No graphical session detected");
            return Ok(Vec::new());
        }

        match detect_monitors() {
            Ok(monitors) => Ok(ScreenSource::from_monitors(&monitors)),
            Err(e) => {
                tracing::warn!(error = %e, "Monitor enumeration failed");
                Ok(Vec::new())
            }
        }
    }

    fn open(
        &self,
        source: &ScreenSource,
        requested: Resolution,
    ) -> GifcapResult<Box<dyn MediaStream>> {
        let m = &source.monitor;
        let region = x11_capture_region_fragment(m.x, m.y, m.width, m.height)?;
        let launch = screen_launch_line(&region, requested, self.show_pointer);
        tracing::debug!(%launch, "Building capture pipeline");

        let stream = GstScreenStream::launch(&source.id, &launch, requested)?;
        Ok(Box::new(stream))
    }
}

fn screen_launch_line(region: &str, requested: Resolution, show_pointer: bool) -> String {
    let Resolution { width, height } = requested;
    // Streamable WebM keeps the muxer from seeking back to patch headers,
    // which an appsink cannot honor.
    format!(
        "ximagesrc use-damage=false show-pointer={show_pointer}{region} \
         ! video/x-raw,framerate={CAPTURE_FPS}/1 \
         ! videoconvert ! videoscale \
         ! video/x-raw,width={width},height={height} \
         ! identity name={RAW_STAGE} \
         ! queue max-size-buffers=200 leaky=downstream \
         ! vp8enc deadline=1 cpu-used=8 \
         ! webmmux streamable=true \
         ! appsink name={SINK} sync=false"
    )
}

/// A running capture pipeline whose encoded output is pulled from an
/// `appsink`.
pub struct GstScreenStream {
    name: String,
    pipeline: gst::Pipeline,
    sink: gst_app::AppSink,
    resolution: Resolution,
    released: bool,
}

impl GstScreenStream {
    fn launch(name: &str, launch: &str, requested: Resolution) -> GifcapResult<Self> {
        init_gstreamer()?;

        let element = gst::parse::launch(launch)
            .map_err(|e| GifcapError::stream(format!("Failed to build pipeline: {e}")))?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| GifcapError::stream("Launch string did not produce a pipeline"))?;

        let sink = pipeline
            .by_name(SINK)
            .and_then(|e| e.dynamic_cast::<gst_app::AppSink>().ok())
            .ok_or_else(|| GifcapError::stream("Capture pipeline has no appsink"))?;

        let mut stream = Self {
            name: name.to_string(),
            pipeline,
            sink,
            resolution: requested,
            released: false,
        };
        stream.start()?;
        stream.resolution = stream.negotiated_resolution().unwrap_or_else(|| {
            tracing::warn!(%requested, "Could not read negotiated caps; assuming request");
            requested
        });
        tracing::info!(pipeline = %stream.name, resolution = %stream.resolution, "Capture started");
        Ok(stream)
    }

    fn start(&mut self) -> GifcapResult<()> {
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            GifcapError::stream(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;

        match self.pipeline.state(gst::ClockTime::from_seconds(10)) {
            (Ok(_), gst::State::Playing, _) => Ok(()),
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
                Ok(())
            }
            (Err(e), _, _) => {
                self.release();
                Err(GifcapError::stream(format!(
                    "{} pipeline failed to reach Playing state: {e:?}",
                    self.name
                )))
            }
        }
    }

    /// Caps on the raw stage before the encoder, once data flows.
    fn negotiated_resolution(&self) -> Option<Resolution> {
        let pad = self.pipeline.by_name(RAW_STAGE)?.static_pad("src")?;
        let deadline = Instant::now() + CAPS_WAIT;
        loop {
            if let Some(caps) = pad.current_caps() {
                let s = caps.structure(0)?;
                let width = s.get::<i32>("width").ok()?;
                let height = s.get::<i32>("height").ok()?;
                return Some(Resolution::new(
                    u32::try_from(width).ok()?,
                    u32::try_from(height).ok()?,
                ));
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn check_bus(&self) -> GifcapResult<bool> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(false);
        };
        while let Some(msg) =
            bus.pop_filtered(&[gst::MessageType::Error, gst::MessageType::Eos])
        {
            match msg.view() {
                gst::MessageView::Error(e) => {
                    return Err(GifcapError::stream(format!(
                        "{} pipeline error: {}",
                        self.name,
                        e.error()
                    )));
                }
                gst::MessageView::Eos(_) => return Ok(true),
                _ => {}
            }
        }
        Ok(false)
    }

    fn pull_available(&self, timeout: gst::ClockTime) -> GifcapResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(sample) = self.sink.try_pull_sample(timeout) {
            let Some(buffer) = sample.buffer() else {
                continue;
            };
            let map = buffer
                .map_readable()
                .map_err(|e| GifcapError::stream(format!("Unreadable capture buffer: {e}")))?;
            out.extend_from_slice(map.as_slice());
        }
        Ok(out)
    }
}

impl MediaStream for GstScreenStream {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn poll_chunk(&mut self) -> GifcapResult<StreamPoll> {
        if self.released {
            return Ok(StreamPoll::Ended);
        }
        let data = self.pull_available(gst::ClockTime::ZERO)?;
        let ended = self.check_bus()?;

        if !data.is_empty() {
            Ok(StreamPoll::Data(data))
        } else if ended || self.sink.is_eos() {
            Ok(StreamPoll::Ended)
        } else {
            Ok(StreamPoll::Pending)
        }
    }

    fn finish(&mut self) -> GifcapResult<Vec<Vec<u8>>> {
        if self.released {
            return Ok(Vec::new());
        }
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            tracing::warn!(pipeline = %self.name, "Failed to send EOS event; output may be truncated");
        }

        let mut tail = Vec::new();
        let start = Instant::now();
        while !self.sink.is_eos() {
            if start.elapsed() >= EOS_DRAIN {
                tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                break;
            }
            let chunk = self.pull_available(gst::ClockTime::from_mseconds(100))?;
            if !chunk.is_empty() {
                tail.push(chunk);
            }
            self.check_bus()?;
        }
        tracing::debug!(pipeline = %self.name, chunks = tail.len(), "Capture pipeline drained");
        Ok(tail)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = %self.name, error = ?e, "Failed to stop pipeline");
        }
    }
}

impl Drop for GstScreenStream {
    fn drop(&mut self) {
        self.release();
    }
}

fn init_gstreamer() -> GifcapResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(GifcapError::stream(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

/// `ximagesrc` crop properties; the end coordinates are inclusive.
fn x11_capture_region_fragment(x: i32, y: i32, width: u32, height: u32) -> GifcapResult<String> {
    if width == 0 || height == 0 {
        return Err(GifcapError::stream(format!(
            "Invalid X11 capture region {width}x{height} at ({x},{y})"
        )));
    }

    let width_i32 = i32::try_from(width)
        .map_err(|_| GifcapError::stream(format!("X11 capture width too large: {width}")))?;
    let height_i32 = i32::try_from(height)
        .map_err(|_| GifcapError::stream(format!("X11 capture height too large: {height}")))?;

    let endx = x
        .checked_add(width_i32 - 1)
        .ok_or_else(|| GifcapError::stream("X11 capture region x-range overflow"))?;
    let endy = y
        .checked_add(height_i32 - 1)
        .ok_or_else(|| GifcapError::stream("X11 capture region y-range overflow"))?;

    Ok(format!(" startx={x} starty={y} endx={endx} endy={endy}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x11_region_fragment_uses_inclusive_end_coordinates() {
        let fragment = x11_capture_region_fragment(2560, 0, 2560, 1440).unwrap();
        assert_eq!(fragment, " startx=2560 starty=0 endx=5119 endy=1439");
    }

    #[test]
    fn x11_region_fragment_rejects_zero_size() {
        let err = x11_capture_region_fragment(0, 0, 0, 1080).unwrap_err();
        assert!(err.to_string().contains("Invalid X11 capture region"));
    }

    #[test]
    fn launch_line_requests_logical_size_and_streamable_webm() {
        let line = screen_launch_line(
            " startx=0 starty=0 endx=99 endy=99",
            Resolution::new(1280, 720),
            false,
        );
        assert!(line.starts_with("ximagesrc use-damage=false show-pointer=false startx=0"));
        assert!(line.contains("video/x-raw,width=1280,height=720"));
        assert!(line.contains("identity name=raw"));
        assert!(line.contains("webmmux streamable=true"));
        assert!(line.ends_with("appsink name=sink sync=false"));
    }
}
