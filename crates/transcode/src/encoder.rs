//! Encoder process supervision.
//!
//! The encoder runs as a child process with its stderr drained
//! concurrently: the tail is kept for diagnostics and status lines are
//! scanned for progress. Exit code 0 is the only success signal.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use gifcap_common::error::{EncodeFailure, GifcapError, GifcapResult};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::broadcast;

/// Bytes of stderr kept for error reports.
pub const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// How long to wait for the stderr reader after the process is gone.
const READER_GRACE: Duration = Duration::from_secs(1);

/// Encoder progress, as reported on its status lines. Informational only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscodeProgress {
    /// Output timestamp reached so far.
    pub out_time_secs: f64,
}

/// Settings for one encoder run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub progress: Option<broadcast::Sender<TranscodeProgress>>,
}

/// What a successful run left behind.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    pub diagnostics: String,
    pub elapsed: Duration,
}

/// Run the encoder to completion.
///
/// Dropping the returned future kills the process.
pub async fn run_encoder(
    program: &Path,
    args: &[OsString],
    options: &RunOptions,
) -> GifcapResult<EncoderOutput> {
    tracing::debug!(program = %program.display(), ?args, "Running encoder");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| GifcapError::EncoderSpawn {
        path: program.to_path_buf(),
        source,
    })?;
    tracing::info!(pid = child.id(), "Encoder process started");

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| GifcapError::stream("Failed to capture encoder stderr"))?;
    let reader = tokio::spawn(drain_stderr(stderr, options.progress.clone()));

    let status = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!(timeout_secs = limit.as_secs_f64(), "Encoder timed out; killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill encoder");
                }
                let diagnostics = collect(reader).await;
                return Err(GifcapError::Encode {
                    failure: EncodeFailure::Timeout {
                        secs: limit.as_secs(),
                    },
                    diagnostics,
                });
            }
        },
        None => child.wait().await?,
    };

    let diagnostics = collect(reader).await;
    let elapsed = start.elapsed();

    match classify(status) {
        None => {
            tracing::info!(elapsed_secs = elapsed.as_secs_f64(), "Encoder finished");
            Ok(EncoderOutput {
                diagnostics,
                elapsed,
            })
        }
        Some(failure) => {
            tracing::warn!(%failure, "Encoder failed");
            Err(GifcapError::Encode {
                failure,
                diagnostics,
            })
        }
    }
}

fn classify(status: ExitStatus) -> Option<EncodeFailure> {
    match status.code() {
        Some(0) => None,
        Some(code) => Some(EncodeFailure::Exit(code)),
        None => Some(EncodeFailure::Signal),
    }
}

async fn collect(reader: tokio::task::JoinHandle<String>) -> String {
    match tokio::time::timeout(READER_GRACE, reader).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => format!("<failed to join stderr reader: {e}>"),
        Err(_) => "<stderr reader did not finish>".to_string(),
    }
}

async fn drain_stderr<R>(
    mut stderr: R,
    progress: Option<broadcast::Sender<TranscodeProgress>>,
) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail = StderrTail::new(STDERR_TAIL_BYTES);
    let mut pending = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tail.push(&format!("<failed to read encoder stderr: {e}>"));
                break;
            }
        };
        pending.extend_from_slice(&buf[..n]);

        // ffmpeg rewrites its status line with `\r`.
        while let Some(pos) = pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            handle_line(&String::from_utf8_lossy(&line), &mut tail, progress.as_ref());
        }
    }
    if !pending.is_empty() {
        handle_line(&String::from_utf8_lossy(&pending), &mut tail, progress.as_ref());
    }

    tail.text()
}

fn handle_line(
    line: &str,
    tail: &mut StderrTail,
    progress: Option<&broadcast::Sender<TranscodeProgress>>,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if let Some(out_time_secs) = parse_progress_time(line) {
        tracing::trace!(out_time_secs, "Encoder progress");
        if let Some(tx) = progress {
            // No subscribers is fine.
            let _ = tx.send(TranscodeProgress { out_time_secs });
        }
    }
    tail.push(line);
}

/// Extract `time=HH:MM:SS.cc` from an ffmpeg status line.
pub fn parse_progress_time(line: &str) -> Option<f64> {
    let value = line
        .split_whitespace()
        .find_map(|token| token.strip_prefix("time="))?;
    let mut parts = value.split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// The most recent lines of stderr, bounded in bytes.
#[derive(Debug)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
    limit: usize,
}

impl StderrTail {
    fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            limit,
        }
    }

    fn push(&mut self, line: &str) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_string());
        while self.bytes > self.limit && self.lines.len() > 1 {
            if let Some(dropped) = self.lines.pop_front() {
                self.bytes -= dropped.len() + 1;
            }
        }
    }

    fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}
