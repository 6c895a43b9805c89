//! GifCap Artifact Store
//!
//! The save folder holds two kinds of files:
//!
//! ```text
//! <save dir>/
//! ├── temp_2024-03-05T14-07-09-123Z.webm        raw capture, removed after a successful transcode
//! └── recording_2024-03-05T14-07-09-123Z.gif    finished artifact
//! ```
//!
//! Only files inside the save folder can be read, deleted, or revealed.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use gifcap_common::config::AppConfig;
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::{ArtifactInfo, ARTIFACT_EXTENSION, RAW_CAPTURE_EXTENSION};
use tokio::io::AsyncWriteExt;

/// Prefix of raw capture files.
pub const RAW_CAPTURE_PREFIX: &str = "temp_";

/// Prefix of finished artifacts.
pub const ARTIFACT_PREFIX: &str = "recording_";

/// Suffixes tried before giving up on a timestamp.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// A raw capture on disk and the artifact name reserved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    pub path: PathBuf,
    pub artifact: PathBuf,
}

/// File-system backed artifact storage rooted at the save folder.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.save_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `temp_<timestamp>.webm` in the save folder.
    pub fn raw_capture_path(&self, timestamp: &str) -> PathBuf {
        self.dir
            .join(format!("{RAW_CAPTURE_PREFIX}{timestamp}.{RAW_CAPTURE_EXTENSION}"))
    }

    /// `recording_<timestamp>.gif` in the save folder.
    pub fn artifact_path(&self, timestamp: &str) -> PathBuf {
        self.dir
            .join(format!("{ARTIFACT_PREFIX}{timestamp}.{ARTIFACT_EXTENSION}"))
    }

    pub async fn ensure_dir(&self) -> GifcapResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GifcapError::artifact_io(&self.dir, e))
    }

    /// Persist a raw capture blob under a fresh temporary name.
    ///
    /// The name is reserved with an exclusive create. When `timestamp` is
    /// already taken by another capture or artifact, `-1`, `-2`, ... is
    /// appended, and the artifact path shares the reserved stem.
    pub async fn write_raw_capture(&self, bytes: &[u8], timestamp: &str) -> GifcapResult<RawCapture> {
        self.ensure_dir().await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stem = if attempt == 0 {
                timestamp.to_string()
            } else {
                format!("{timestamp}-{attempt}")
            };
            let artifact = self.artifact_path(&stem);
            if tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
                continue;
            }

            let path = self.raw_capture_path(&stem);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(GifcapError::artifact_io(&path, e)),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(GifcapError::artifact_io(&path, e));
            }

            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Raw capture written");
            return Ok(RawCapture { path, artifact });
        }

        Err(GifcapError::artifact_io(
            self.raw_capture_path(timestamp),
            io::Error::new(io::ErrorKind::AlreadyExists, "no free capture name"),
        ))
    }

    /// Remove a raw capture once it has been transcoded. A file that is
    /// already gone is not an error.
    pub async fn discard_raw_capture(&self, path: &Path) -> GifcapResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Raw capture removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Raw capture already removed");
                Ok(())
            }
            Err(e) => Err(GifcapError::artifact_io(path, e)),
        }
    }

    /// Saved artifacts, newest first.
    pub async fn list(&self) -> GifcapResult<Vec<ArtifactInfo>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GifcapError::artifact_io(&self.dir, e)),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GifcapError::artifact_io(&self.dir, e))?
        {
            let path = entry.path();
            if !has_extension(&path, ARTIFACT_EXTENSION) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable artifact");
                    continue;
                }
            };
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();

            artifacts.push(ArtifactInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes: metadata.len(),
                created_at: created,
            });
        }

        artifacts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(artifacts)
    }

    pub async fn read(&self, path: &Path) -> GifcapResult<Vec<u8>> {
        let path = self.resolve(path)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| map_io(&path, e))
    }

    pub async fn delete(&self, path: &Path) -> GifcapResult<()> {
        let path = self.resolve(path)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| map_io(&path, e))?;
        tracing::info!(path = %path.display(), "Artifact deleted");
        Ok(())
    }

    /// Show the artifact in the platform file browser.
    pub fn reveal(&self, path: &Path) -> GifcapResult<()> {
        let path = self.resolve(path)?;
        let mut cmd = reveal_command(&path);
        cmd.spawn()
            .map_err(|e| GifcapError::platform(format!("Failed to open file browser: {e}")))?;
        tracing::debug!(path = %path.display(), "Revealed artifact");
        Ok(())
    }

    /// Resolve a path relative to the save folder and confirm it lies
    /// inside it.
    fn resolve(&self, path: &Path) -> GifcapResult<PathBuf> {
        let candidate = if path.is_relative() {
            self.dir.join(path)
        } else {
            path.to_path_buf()
        };

        let resolved = candidate.canonicalize().map_err(|e| map_io(&candidate, e))?;
        let root = self
            .dir
            .canonicalize()
            .map_err(|e| map_io(&self.dir, e))?;
        if !resolved.starts_with(&root) {
            return Err(GifcapError::artifact_io(
                candidate,
                io::Error::new(io::ErrorKind::PermissionDenied, "outside the save folder"),
            ));
        }
        Ok(resolved)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn map_io(path: &Path, e: io::Error) -> GifcapError {
    if e.kind() == io::ErrorKind::NotFound {
        GifcapError::ArtifactNotFound {
            path: path.to_path_buf(),
        }
    } else {
        GifcapError::artifact_io(path, e)
    }
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg("-R").arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn reveal_command(path: &Path) -> Command {
    let mut select = std::ffi::OsString::from("/select,");
    select.push(path);
    let mut cmd = Command::new("explorer");
    cmd.arg(select);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn reveal_command(path: &Path) -> Command {
    // xdg-open cannot select a file; open its folder.
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path.parent().unwrap_or(path));
    cmd
}
