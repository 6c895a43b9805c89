//! Best-effort source dimension probing with `ffprobe`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use gifcap_model::Resolution;
use tokio::process::Command;

/// Find `ffprobe` next to the resolved encoder, else on `PATH`.
pub fn locate_ffprobe(encoder: &Path) -> Option<PathBuf> {
    let name = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
    encoder
        .parent()
        .map(|dir| dir.join(name))
        .filter(|candidate| candidate.is_file())
        .or_else(|| which::which("ffprobe").ok())
}

/// Width and height of the first video stream, or `None` when they
/// cannot be determined.
pub async fn probe_resolution(ffprobe: &Path, input: &Path) -> Option<Resolution> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        tracing::debug!(
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "ffprobe failed"
        );
        return None;
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `WIDTHxHEIGHT` from ffprobe's CSV output.
pub fn parse_probe_output(raw: &str) -> Option<Resolution> {
    let line = raw.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let width = w.parse::<u32>().ok()?;
    let height = h.trim_end_matches(',').parse::<u32>().ok()?;
    let resolution = Resolution::new(width, height);
    (!resolution.is_empty()).then_some(resolution)
}
