//! Encode settings and transcode jobs.

use std::path::PathBuf;

use gifcap_common::config::{AppConfig, DEFAULT_FPS};
use serde::{Deserialize, Serialize};

use crate::region::{Region, Resolution};

/// Per-invocation encode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeConfig {
    /// Output frame rate.
    pub fps: u32,

    /// Maximum output width; 0 leaves the width unconstrained.
    pub max_width: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            max_width: 0,
        }
    }
}

impl From<&AppConfig> for EncodeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            fps: if config.fps == 0 {
                DEFAULT_FPS
            } else {
                config.fps
            },
            max_width: config.max_width,
        }
    }
}

/// A single run of the transcode pipeline.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Raw capture on disk.
    pub input: PathBuf,

    /// Optional crop, already in source-pixel coordinates.
    pub region: Option<Region>,

    /// Resolution of the capture, when known.
    pub source: Option<Resolution>,

    /// Encode parameters.
    pub config: EncodeConfig,

    /// Where the artifact should be written.
    pub output: PathBuf,
}

impl TranscodeJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, config: EncodeConfig) -> Self {
        Self {
            input: input.into(),
            region: None,
            source: None,
            config,
            output: output.into(),
        }
    }

    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn with_source(mut self, source: Option<Resolution>) -> Self {
        self.source = source;
        self
    }
}
