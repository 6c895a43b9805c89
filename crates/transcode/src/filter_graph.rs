//! Filter graph construction for palette-based GIF output.
//!
//! Stage order is fixed: crop, frame-rate normalization, optional
//! downscale, then a two-pass palette generate/apply. Cropping runs
//! before scaling so region coordinates stay in source pixels.

use std::fmt;

use gifcap_model::{EncodeConfig, Region};

/// Palette size for generated GIF palettes.
pub const PALETTE_COLORS: u32 = 256;

/// Bayer matrix scale used when applying the palette.
pub const BAYER_SCALE: u32 = 5;

/// One ffmpeg filter in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    Crop {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
    Fps(u32),
    /// Lanczos downscale to `min(max_width, input width)`, height derived
    /// from the aspect ratio.
    Scale { max_width: u32 },
    Split,
    PaletteGen { max_colors: u32 },
    PaletteUse { bayer_scale: u32 },
}

impl FilterStage {
    /// Palette stages start a new labelled chain.
    fn starts_chain(&self) -> bool {
        matches!(self, FilterStage::PaletteGen { .. } | FilterStage::PaletteUse { .. })
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::Crop {
                width,
                height,
                x,
                y,
            } => write!(f, "crop={width}:{height}:{x}:{y}"),
            FilterStage::Fps(fps) => write!(f, "fps={fps}"),
            FilterStage::Scale { max_width } => {
                write!(f, "scale='min({max_width},iw)':-1:flags=lanczos")
            }
            FilterStage::Split => f.write_str("split[s0][s1]"),
            FilterStage::PaletteGen { max_colors } => {
                write!(f, "[s0]palettegen=max_colors={max_colors}[p]")
            }
            FilterStage::PaletteUse { bayer_scale } => {
                write!(f, "[s1][p]paletteuse=dither=bayer:bayer_scale={bayer_scale}")
            }
        }
    }
}

/// An ordered chain of filter stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    stages: Vec<FilterStage>,
}

impl FilterGraph {
    /// Build the GIF graph for an optional crop and encode settings.
    ///
    /// Regions without area are treated as "no crop"; a zero `max_width`
    /// leaves the size alone.
    pub fn for_gif(region: Option<&Region>, config: &EncodeConfig) -> Self {
        let mut stages = Vec::with_capacity(6);

        if let Some(region) = region.filter(|r| !r.is_empty()) {
            stages.push(FilterStage::Crop {
                width: region.width,
                height: region.height,
                x: region.x,
                y: region.y,
            });
        }

        stages.push(FilterStage::Fps(config.fps.max(1)));

        if config.max_width > 0 {
            stages.push(FilterStage::Scale {
                max_width: config.max_width,
            });
        }

        stages.push(FilterStage::Split);
        stages.push(FilterStage::PaletteGen {
            max_colors: PALETTE_COLORS,
        });
        stages.push(FilterStage::PaletteUse {
            bayer_scale: BAYER_SCALE,
        });

        Self { stages }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Render as a `-filter_complex` argument.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, stage) in self.stages.iter().enumerate() {
            if idx > 0 {
                f.write_str(if stage.starts_chain() { ";" } else { "," })?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}
