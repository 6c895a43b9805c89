//! Error types shared across GifCap crates.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for GifCap operations.
#[derive(Debug, thiserror::Error)]
pub enum GifcapError {
    #[error("No screen source available for capture")]
    NoSourceAvailable,

    #[error("Stream error: {message}")]
    Stream { message: String },

    #[error("Encoder not found (tried: {})", .attempts.join("; "))]
    EncoderNotFound { attempts: Vec<String> },

    #[error("Failed to start encoder {}: {source}", .path.display())]
    EncoderSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding failed ({failure}): {diagnostics}")]
    Encode {
        failure: EncodeFailure,
        diagnostics: String,
    },

    #[error("Artifact I/O error at {}: {source}", .path.display())]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact not found: {}", .path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("Configuration at {} is corrupt: {message}", .path.display())]
    ConfigCorrupt { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to register shortcut {shortcut}: {reason}")]
    HotkeyRegistrationFailed { shortcut: String, reason: String },

    #[error("Invalid region: {message}")]
    InvalidRegion { message: String },

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    #[error("Region selection error: {message}")]
    Selection { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GifcapError.
pub type GifcapResult<T> = Result<T, GifcapError>;

/// How an encoder run ended when it did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFailure {
    /// The process exited with a nonzero code.
    Exit(i32),
    /// The process was terminated by a signal (no exit code).
    Signal,
    /// The process exceeded the configured time bound and was killed.
    Timeout { secs: u64 },
}

impl fmt::Display for EncodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeFailure::Exit(code) => write!(f, "exit code {code}"),
            EncodeFailure::Signal => write!(f, "terminated by signal"),
            EncodeFailure::Timeout { secs } => write!(f, "timed out after {secs}s"),
        }
    }
}

impl GifcapError {
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion {
            message: msg.into(),
        }
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn artifact_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ArtifactIo {
            path: path.into(),
            source,
        }
    }

    /// Exit code of a failed encoder run, if the process exited normally.
    pub fn encoder_exit_code(&self) -> Option<i32> {
        match self {
            Self::Encode {
                failure: EncodeFailure::Exit(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_not_found_lists_every_attempt() {
        let err = GifcapError::EncoderNotFound {
            attempts: vec!["/a/ffmpeg: missing".into(), "/b/ffmpeg: not executable".into()],
        };
        assert_eq!(
            err.to_string(),
            "Encoder not found (tried: /a/ffmpeg: missing; /b/ffmpeg: not executable)"
        );
    }

    #[test]
    fn encode_error_exposes_exit_code() {
        let err = GifcapError::Encode {
            failure: EncodeFailure::Exit(1),
            diagnostics: "Invalid data".into(),
        };
        assert_eq!(err.encoder_exit_code(), Some(1));
        assert_eq!(err.to_string(), "Encoding failed (exit code 1): Invalid data");

        let timeout = GifcapError::Encode {
            failure: EncodeFailure::Timeout { secs: 30 },
            diagnostics: String::new(),
        };
        assert_eq!(timeout.encoder_exit_code(), None);
    }
}
