//! Region selection.
//!
//! The overlay itself lives outside the host; the host only sees its two
//! terminal outcomes.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::Region;
use tokio::process::Command;

use crate::host::Host;

/// How a selection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Confirmed(Region),
    Cancelled,
}

/// Produces a screen-space rectangle from the user.
#[async_trait]
pub trait RegionSelector: Send + Sync {
    async fn select(&self) -> GifcapResult<SelectionOutcome>;

    fn name(&self) -> &str;
}

/// Interactive selection with `slop`.
#[derive(Debug, Clone)]
pub struct SlopSelector {
    program: String,
}

impl SlopSelector {
    pub fn new() -> Self {
        Self {
            program: "slop".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SlopSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegionSelector for SlopSelector {
    async fn select(&self) -> GifcapResult<SelectionOutcome> {
        let output = Command::new(&self.program)
            .args(["--format", "%x %y %w %h\n"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GifcapError::selection(format!("Failed to run {}: {e}", self.program)))?;

        // slop exits nonzero when the user presses Escape or right-clicks.
        if !output.status.success() {
            tracing::debug!(status = %output.status, "Selection cancelled");
            return Ok(SelectionOutcome::Cancelled);
        }

        let region = parse_slop_output(&String::from_utf8_lossy(&output.stdout))?;
        if region.is_empty() {
            return Ok(SelectionOutcome::Cancelled);
        }
        Ok(SelectionOutcome::Confirmed(region))
    }

    fn name(&self) -> &str {
        "slop"
    }
}

/// Parse `x y w h`.
pub fn parse_slop_output(raw: &str) -> GifcapResult<Region> {
    let values = raw
        .split_whitespace()
        .map(str::parse::<u32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| GifcapError::selection(format!("Unexpected selector output {raw:?}: {e}")))?;

    match values.as_slice() {
        [x, y, width, height] => Ok(Region {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        _ => Err(GifcapError::selection(format!(
            "Unexpected selector output {raw:?}"
        ))),
    }
}

/// Always returns the same region.
#[derive(Debug, Clone, Copy)]
pub struct FixedRegionSelector(pub Region);

#[async_trait]
impl RegionSelector for FixedRegionSelector {
    async fn select(&self) -> GifcapResult<SelectionOutcome> {
        Ok(SelectionOutcome::Confirmed(self.0))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Delegates to a connected UI surface: emits `start-selection` and waits
/// for `select-region` or `cancel-selection`.
#[derive(Clone)]
pub struct UiSelector {
    host: Arc<Host>,
}

impl UiSelector {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl RegionSelector for UiSelector {
    async fn select(&self) -> GifcapResult<SelectionOutcome> {
        let pending = self.host.begin_selection().await;
        // A dropped sender means a newer selection replaced this one.
        Ok(pending.await.unwrap_or(SelectionOutcome::Cancelled))
    }

    fn name(&self) -> &str {
        "ui"
    }
}
