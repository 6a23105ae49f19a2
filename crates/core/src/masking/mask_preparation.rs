//! Bringing the segmentation map onto the image grid and splitting it into
//! clean binary region masks.

use image::imageops::{self, FilterType};
use image::Rgb;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::shared::config::MorphologyConfig;
use crate::shared::error::{FaceContourError, Result};
use crate::shared::mask::{RegionMask, SegmentationMask, BACKGROUND_COLOR};

/// Resizes the mask to `target_height` x `target_width` with nearest-neighbour
/// sampling so labels never blend. Matching masks are returned unchanged.
pub fn prepare(
    mask: &SegmentationMask,
    target_height: u32,
    target_width: u32,
) -> Result<SegmentationMask> {
    if target_height == 0 || target_width == 0 {
        return Err(FaceContourError::invalid_input(format!(
            "target shape ({target_height}, {target_width}) must be positive"
        )));
    }
    if mask.width() == 0 || mask.height() == 0 {
        return Err(FaceContourError::invalid_input("segmentation mask has zero size"));
    }
    if mask.dimensions() == (target_width, target_height) {
        return Ok(mask.clone());
    }
    log::debug!(
        "Resizing mask {}x{} -> {}x{}",
        mask.width(),
        mask.height(),
        target_width,
        target_height
    );
    Ok(SegmentationMask::new(imageops::resize(
        mask.as_image(),
        target_width,
        target_height,
        FilterType::Nearest,
    )))
}

/// Pixels whose color equals `color` exactly.
pub fn isolate_color(mask: &SegmentationMask, color: Rgb<u8>) -> RegionMask {
    let image = mask.as_image();
    RegionMask::from_fn(mask.width(), mask.height(), |x, y| {
        *image.get_pixel(x, y) == color
    })
}

/// Splits the distinct mask colors into the main face color and the ranked
/// extras. Black is background; the first remaining color is the main face.
pub fn rank_colors(mask: &SegmentationMask) -> Option<(Rgb<u8>, Vec<Rgb<u8>>)> {
    let mut colors = mask
        .distinct_colors()
        .into_iter()
        .filter(|c| *c != BACKGROUND_COLOR);
    let main = colors.next()?;
    Some((main, colors.collect()))
}

/// Morphological noise removal for binary masks.
#[derive(Clone, Debug)]
pub struct MaskCleaner {
    config: MorphologyConfig,
}

impl MaskCleaner {
    pub fn new(config: MorphologyConfig) -> Self {
        Self { config }
    }

    /// Close (small, repeated), open (small), close (large), open (large):
    /// fills pinholes, drops speckle, then smooths the outline.
    pub fn clean(&self, mask: &RegionMask) -> RegionMask {
        let c = &self.config;
        let small_close = c.small_radius.saturating_mul(c.small_close_iterations);
        let image = morphology::close(mask.as_image(), Norm::L1, small_close);
        let image = morphology::open(&image, Norm::L1, c.small_radius);
        let image = morphology::close(&image, Norm::L1, c.large_radius);
        let image = morphology::open(&image, Norm::L1, c.large_radius);
        RegionMask::from_image(image)
    }

    /// Large-kernel close then open, then drops components under `min_area`.
    pub fn clean_region(&self, mask: &RegionMask, min_area: usize) -> RegionMask {
        let k = self.config.large_radius;
        let image = morphology::close(mask.as_image(), Norm::L1, k);
        let image = morphology::open(&image, Norm::L1, k);
        RegionMask::from_image(image).without_small_components(min_area)
    }

    /// Single small open, used to erase seams left by mask subtraction.
    pub fn open_small(&self, mask: &RegionMask) -> RegionMask {
        RegionMask::from_image(morphology::open(
            mask.as_image(),
            Norm::L1,
            self.config.small_radius,
        ))
    }
}

impl Default for MaskCleaner {
    fn default() -> Self {
        Self::new(MorphologyConfig::default())
    }
}
