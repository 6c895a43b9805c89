//! Clock and timestamp utilities.
//!
//! Every recording is anchored to a monotonic epoch taken when capture
//! starts. Artifact names embed the wall-clock time of the save request.

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment recording started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Get seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// ISO-8601 timestamp safe for file names: `:` and `.` become `-`.
///
/// `2024-03-05T14:07:09.123Z` becomes `2024-03-05T14-07-09-123Z`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// [`file_timestamp`] for the current instant.
pub fn file_timestamp_now() -> String {
    file_timestamp(Utc::now())
}
