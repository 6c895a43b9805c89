//! GifCap platform core contracts.
//!
//! Cross-platform display and screen-source data structures used by the
//! capture engine without coupling to a concrete OS backend.

use serde::{Deserialize, Serialize};

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Scale factor (for example 1.0, 1.25, 2.0).
    pub scale_factor: f64,
    /// Whether this monitor is primary.
    pub primary: bool,
}

impl MonitorInfo {
    /// Logical resolution (physical / scale).
    pub fn logical_width(&self) -> u32 {
        (self.width as f64 / self.scale_factor.max(f64::EPSILON)) as u32
    }

    /// Logical resolution (physical / scale).
    pub fn logical_height(&self) -> u32 {
        (self.height as f64 / self.scale_factor.max(f64::EPSILON)) as u32
    }
}

/// Display server / platform family used for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    Windows,
    MacOS,
    #[default]
    Unknown,
}

/// A capturable screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenSource {
    /// Stable identifier for the session (for example `screen:0`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Geometry of the screen this source covers.
    pub monitor: MonitorInfo,
}

impl ScreenSource {
    /// Build one source per monitor, primary first, then left-to-right.
    pub fn from_monitors(monitors: &[MonitorInfo]) -> Vec<ScreenSource> {
        let mut ordered: Vec<&MonitorInfo> = monitors.iter().collect();
        ordered.sort_by_key(|m| (!m.primary, m.x, m.y));
        ordered
            .into_iter()
            .enumerate()
            .map(|(idx, monitor)| ScreenSource {
                id: format!("screen:{idx}"),
                name: monitor.name.clone(),
                monitor: monitor.clone(),
            })
            .collect()
    }
}
