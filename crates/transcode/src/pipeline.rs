//! The transcode entry point.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gifcap_common::config::AppConfig;
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::TranscodeJob;
use tokio::sync::broadcast;

use crate::encoder::{run_encoder, RunOptions, TranscodeProgress};
use crate::filter_graph::FilterGraph;
use crate::probe::{locate_ffprobe, probe_resolution};
use crate::resolver::EncoderResolver;

/// How the encoder is found and supervised.
#[derive(Debug, Clone, Default)]
pub struct TranscodeOptions {
    /// Explicit encoder location, tried before the standard search.
    pub encoder_path: Option<PathBuf>,

    /// Upper bound on encoder run time.
    pub timeout: Option<Duration>,

    /// Receives progress updates when set.
    pub progress: Option<broadcast::Sender<TranscodeProgress>>,
}

impl TranscodeOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            encoder_path: config.encoder_path.clone(),
            timeout: config.encoder_timeout(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: broadcast::Sender<TranscodeProgress>) -> Self {
        self.progress = Some(tx);
        self
    }
}

/// Resolve the encoder, then run the job. Fails with `EncoderNotFound`
/// before anything is spawned when no encoder exists.
pub async fn transcode(job: &TranscodeJob, options: &TranscodeOptions) -> GifcapResult<PathBuf> {
    let encoder = EncoderResolver::ffmpeg(options.encoder_path.as_deref()).resolve()?;
    transcode_with(&encoder, job, options).await
}

/// Run the job with an already resolved encoder.
///
/// On failure, timeout, or when the returned future is dropped, the
/// encoder is killed and any partial output is removed. The input file
/// is never touched.
pub async fn transcode_with(
    encoder: &Path,
    job: &TranscodeJob,
    options: &TranscodeOptions,
) -> GifcapResult<PathBuf> {
    if !job.input.is_file() {
        return Err(GifcapError::ArtifactNotFound {
            path: job.input.clone(),
        });
    }

    if let Some(region) = job.region.filter(|r| !r.is_empty()) {
        let source = match job.source {
            Some(source) => Some(source),
            None => match locate_ffprobe(encoder) {
                Some(ffprobe) => probe_resolution(&ffprobe, &job.input).await,
                None => None,
            },
        };
        match source {
            Some(source) => region.validate_within(source)?,
            None => tracing::debug!(%region, "Source size unknown; crop not validated"),
        }
    }

    let graph = FilterGraph::for_gif(job.region.as_ref(), &job.config);
    let args = encoder_args(&job.input, &graph, &job.output);

    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GifcapError::artifact_io(parent, e))?;
    }

    tracing::info!(
        input = %job.input.display(),
        output = %job.output.display(),
        graph = %graph,
        "Starting transcode"
    );

    let guard = PartialOutput::arm(&job.output);
    let run_options = RunOptions {
        timeout: options.timeout,
        progress: options.progress.clone(),
    };
    let output = run_encoder(encoder, &args, &run_options).await?;
    guard.disarm();

    tracing::info!(
        output = %job.output.display(),
        elapsed_secs = output.elapsed.as_secs_f64(),
        "Transcode complete"
    );
    Ok(job.output.clone())
}

/// `-hide_banner -i <input> -filter_complex <graph> -y <output>`
pub fn encoder_args(input: &Path, graph: &FilterGraph, output: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-filter_complex".into(),
        graph.render().into(),
        "-y".into(),
        output.as_os_str().to_owned(),
    ]
}

/// Removes the output file unless disarmed.
struct PartialOutput<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialOutput<'a> {
    fn arm(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial output")
            }
        }
    }
}
