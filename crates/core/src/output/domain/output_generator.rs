use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::shared::constants::CHIN_LABEL_NUDGE_X;
use crate::shared::contour::{Contour, RegionContourMap};
use crate::shared::error::{FaceContourError, Result};
use crate::shared::region::FaceRegion;

/// `(height, width)` of the aligned image, in pixels.
pub type ImageShape = (u32, u32);

/// Domain interface for turning a region -> contour map into an encoded document.
///
/// Implementations are pure: the same inputs always produce byte-identical
/// output, and nothing is written anywhere.
pub trait OutputGenerator: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn generate(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

impl OutputFormat {
    pub const ALL: &[OutputFormat] = &[OutputFormat::Svg, OutputFormat::Png, OutputFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        OutputFormat::ALL
            .iter()
            .copied()
            .find(|f| f.extension() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown format '{s}', expected svg, png or json"))
    }
}

/// Rejects empty shapes and backgrounds that do not match the shape.
pub fn validate_inputs(image_shape: ImageShape, background: Option<&RgbImage>) -> Result<()> {
    let (height, width) = image_shape;
    if height == 0 || width == 0 {
        return Err(FaceContourError::invalid_input(format!(
            "image shape ({height}, {width}) must be positive"
        )));
    }
    if let Some(bg) = background {
        if bg.dimensions() != (width, height) {
            return Err(FaceContourError::invalid_input(format!(
                "background is {}x{}, expected {width}x{height}",
                bg.width(),
                bg.height()
            )));
        }
    }
    Ok(())
}

/// Where a region's number is drawn: the contour centroid, nudged right for
/// the chin so it clears the jaw outline.
pub fn label_position(region: FaceRegion, contour: &Contour) -> Option<(i32, i32)> {
    let (x, y) = contour.label_anchor()?;
    let nudge = if region == FaceRegion::Chin {
        CHIN_LABEL_NUDGE_X
    } else {
        0
    };
    Some((x + nudge, y))
}
