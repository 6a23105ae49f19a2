//! Raster preview: per-region tint or stipple plus a stamped region number.
//!
//! Rendering never touches contour data; it only produces a new image.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::contours::contour_extractor::largest_external_contour;
use crate::shared::config::{OverlayConfig, RegionOverlay};
use crate::shared::constants::CM_PER_INCH;
use crate::shared::mask::RegionMask;
use crate::shared::region::FaceRegion;

use super::digit_font;

/// Converts a physical offset to whole pixels at `dpi`.
pub fn cm_to_pixels(cm: f64, dpi: f64) -> i32 {
    (cm * dpi / CM_PER_INCH) as i32
}

/// Nearest-neighbour scale about the canvas center, then a vertical shift.
/// The canvas size never changes; anything pushed off it is dropped.
pub fn transform_mask(mask: &RegionMask, scale_x: f64, scale_y: f64, shift_y: i32) -> RegionMask {
    let scaled = if (scale_x - 1.0).abs() > f64::EPSILON || (scale_y - 1.0).abs() > f64::EPSILON {
        scale_centered(mask, scale_x, scale_y)
    } else {
        mask.clone()
    };
    if shift_y == 0 {
        return scaled;
    }
    let (w, h) = scaled.dimensions();
    RegionMask::from_fn(w, h, |x, y| {
        let src = y as i64 - shift_y as i64;
        src >= 0 && scaled.contains(x, src as u32)
    })
}

fn scale_centered(mask: &RegionMask, scale_x: f64, scale_y: f64) -> RegionMask {
    let (w, h) = mask.dimensions();
    let new_w = (w as f64 * scale_x).max(0.0) as u32;
    let new_h = (h as f64 * scale_y).max(0.0) as u32;
    if new_w == 0 || new_h == 0 {
        return RegionMask::new(w, h);
    }
    let resized = imageops::resize(mask.as_image(), new_w, new_h, FilterType::Nearest);
    let start_x = (w / 2) as i64 - (new_w / 2) as i64;
    let start_y = (h / 2) as i64 - (new_h / 2) as i64;
    RegionMask::from_fn(w, h, |x, y| {
        let sx = x as i64 - start_x;
        let sy = y as i64 - start_y;
        sx >= 0
            && sy >= 0
            && sx < new_w as i64
            && sy < new_h as i64
            && resized.get_pixel(sx as u32, sy as u32)[0] != 0
    })
}

pub struct OverlayRenderer {
    config: OverlayConfig,
}

impl OverlayRenderer {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Composites every configured region in id order onto a copy of `image`.
    /// Regions without overlay settings are skipped.
    pub fn render(&self, image: &RgbImage, masks: &[(FaceRegion, RegionMask)]) -> RgbImage {
        let mut ordered: Vec<&(FaceRegion, RegionMask)> = masks.iter().collect();
        ordered.sort_by_key(|(region, _)| *region);

        let mut canvas = image.clone();
        for (region, mask) in ordered {
            let Some(settings) = self.config.regions.get(region) else {
                continue;
            };
            let placed = self.place(mask, settings);
            if placed.is_empty() {
                log::debug!("Overlay for {region} is empty after transform");
                continue;
            }
            self.blend(&mut canvas, &placed, settings);
            self.stamp_label(&mut canvas, &placed, &region.id().to_string(), settings.label_offset_x);
        }
        canvas
    }

    /// Tints `mask` onto a copy of `image` with the given settings.
    pub fn apply_overlay(&self, image: &RgbImage, mask: &RegionMask, settings: &RegionOverlay) -> RgbImage {
        let mut canvas = image.clone();
        let placed = self.place(mask, settings);
        if !placed.is_empty() {
            self.blend(&mut canvas, &placed, settings);
        }
        canvas
    }

    fn place(&self, mask: &RegionMask, settings: &RegionOverlay) -> RegionMask {
        let shift = cm_to_pixels(settings.shift_cm, self.config.dpi);
        transform_mask(mask, settings.scale_x, settings.scale_y, shift)
    }

    fn blend(&self, canvas: &mut RgbImage, mask: &RegionMask, settings: &RegionOverlay) {
        let color = Rgb(settings.color);
        if settings.dotted {
            let layer = self.dot_layer(mask, color);
            blend_masked(canvas, mask, self.config.dotted_opacity, |x, y| *layer.get_pixel(x, y));
        } else {
            blend_masked(canvas, mask, self.config.flat_opacity, |_, _| color);
        }
    }

    fn dot_layer(&self, mask: &RegionMask, color: Rgb<u8>) -> RgbImage {
        let (w, h) = mask.dimensions();
        let mut layer = RgbImage::new(w, h);
        let spacing = self.config.dot_spacing.max(1) as usize;
        for y in (0..h).step_by(spacing) {
            for x in (0..w).step_by(spacing) {
                if mask.contains(x, y) {
                    draw_filled_circle_mut(&mut layer, (x as i32, y as i32), self.config.dot_radius, color);
                }
            }
        }
        layer
    }

    /// Draws `label` at the centroid of the largest contour of `mask`.
    pub fn stamp_label(&self, canvas: &mut RgbImage, mask: &RegionMask, label: &str, offset_x: i32) {
        let Some(contour) = largest_external_contour(mask) else {
            return;
        };
        if contour.area() <= 0.0 {
            return;
        }
        let Some((cx, cy)) = contour.label_anchor() else {
            return;
        };
        digit_font::draw_centered(
            canvas,
            label,
            (cx + offset_x, cy),
            Rgb(self.config.label_color),
            self.config.label_scale,
        );
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

fn blend_masked(
    canvas: &mut RgbImage,
    mask: &RegionMask,
    alpha: f64,
    source: impl Fn(u32, u32) -> Rgb<u8>,
) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if !mask.contains(x, y) {
            continue;
        }
        let over = source(x, y);
        for c in 0..3 {
            let v = pixel[c] as f64 * (1.0 - alpha) + over[c] as f64 * alpha;
            pixel[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}
