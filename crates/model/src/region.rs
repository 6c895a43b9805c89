//! Capture regions and frame resolutions.
//!
//! A [`Region`] is expressed in the pixel space of the captured video,
//! which is not necessarily the logical display space the user dragged
//! in: platform scaling can make the two differ. [`Region::map_between`]
//! converts explicitly and [`Region::validate_within`] checks the result
//! against the negotiated capture resolution.

use std::fmt;
use std::str::FromStr;

use gifcap_common::error::{GifcapError, GifcapResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rectangle with its origin at the top-left of the frame.
///
/// Deserialization accepts fractional coordinates (overlays report
/// sub-pixel drags) and rounds them; negative values are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    #[serde(deserialize_with = "pixel")]
    pub x: u32,
    #[serde(deserialize_with = "pixel")]
    pub y: u32,
    #[serde(deserialize_with = "pixel")]
    pub width: u32,
    #[serde(deserialize_with = "pixel")]
    pub height: u32,
}

impl Region {
    /// Build a region with a positive size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> GifcapResult<Self> {
        if width == 0 || height == 0 {
            return Err(GifcapError::invalid_region(format!(
                "region must have a positive size, got {width}x{height}"
            )));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// A zero-sized region means "no crop".
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn size(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Check that the crop lies entirely inside a frame of `source` size.
    pub fn validate_within(&self, source: Resolution) -> GifcapResult<()> {
        if self.is_empty() {
            return Err(GifcapError::invalid_region(format!(
                "region {self} has no area"
            )));
        }
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        if right > u64::from(source.width) || bottom > u64::from(source.height) {
            return Err(GifcapError::invalid_region(format!(
                "region {self} exceeds source frame {source}"
            )));
        }
        Ok(())
    }

    /// Rescale a region drawn in `from` space into `to` space.
    ///
    /// Coordinates are rounded to the nearest pixel and the result is
    /// clamped so that it never extends past the target frame.
    pub fn map_between(&self, from: Resolution, to: Resolution) -> Region {
        if from == to || from.is_empty() || to.is_empty() {
            return *self;
        }
        let sx = f64::from(to.width) / f64::from(from.width);
        let sy = f64::from(to.height) / f64::from(from.height);

        let x = scale_axis(self.x, sx).min(to.width.saturating_sub(1));
        let y = scale_axis(self.y, sy).min(to.height.saturating_sub(1));
        let width = scale_axis(self.width, sx).clamp(1, to.width - x);
        let height = scale_axis(self.height, sy).clamp(1, to.height - y);

        Region {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Region {
    type Err = GifcapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GifcapError::invalid_region(format!("{s:?}: {e}")))?;

        match parts.as_slice() {
            [x, y, width, height] => Region::new(*x, *y, *width, *height),
            _ => Err(GifcapError::invalid_region(format!(
                "{s:?}: expected x,y,width,height"
            ))),
        }
    }
}

fn scale_axis(value: u32, factor: f64) -> u32 {
    (f64::from(value) * factor).round() as u32
}

fn pixel<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "pixel coordinate out of range: {value}"
        )));
    }
    Ok(value.round() as u32)
}
