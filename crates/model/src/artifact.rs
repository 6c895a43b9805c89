//! Saved artifact metadata.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File extension of transcoded artifacts.
pub const ARTIFACT_EXTENSION: &str = "gif";

/// File extension of raw captures.
pub const RAW_CAPTURE_EXTENSION: &str = "webm";

/// One artifact in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    /// File name without directory.
    pub name: String,

    /// Absolute path.
    pub path: PathBuf,

    /// Size on disk in bytes.
    pub size_bytes: u64,

    /// Creation time (modification time where the filesystem lacks it).
    pub created_at: DateTime<Utc>,
}
