//! Eye-line alignment and padded cropping.
//!
//! The image is rotated about its center so the two eye centers sit on one
//! row, then cropped to an asymmetric box around the rotated landmarks (more
//! room above the eyes for the forehead than below the chin).

use image::{imageops, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};

use crate::shared::config::AlignmentConfig;
use crate::shared::error::{FaceContourError, Result};
use crate::shared::landmarks::{LandmarkLayout, LandmarkPoint, LandmarkSet};
use crate::shared::mask::{SegmentationMask, BACKGROUND_COLOR};

/// 2x3 affine matrix mapping source pixels to rotated pixels.
pub type AffineMatrix = [[f64; 3]; 2];

pub const IDENTITY: AffineMatrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// Half-open crop rectangle in rotated-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropBox {
    pub x_start: u32,
    pub y_start: u32,
    pub x_end: u32,
    pub y_end: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.x_end - self.x_start
    }

    pub fn height(&self) -> u32 {
        self.y_end - self.y_start
    }
}

/// The geometric part of an alignment, reusable for the segmentation mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pub angle_degrees: f64,
    pub rotation: AffineMatrix,
    pub crop_box: CropBox,
}

impl Alignment {
    pub fn is_rotated(&self) -> bool {
        self.rotation != IDENTITY
    }

    /// Rotates and crops a mask the same way the face was, sampling nearest
    /// labels and filling uncovered pixels with background.
    pub fn apply_to_mask(&self, mask: &SegmentationMask) -> Result<SegmentationMask> {
        let rotated = if self.is_rotated() {
            warp(
                mask.as_image(),
                &projection(&self.rotation)?,
                Interpolation::Nearest,
                BACKGROUND_COLOR,
            )
        } else {
            mask.as_image().clone()
        };
        Ok(SegmentationMask::new(crop(&rotated, &self.crop_box)?))
    }
}

#[derive(Clone, Debug)]
pub struct AlignedFace {
    pub image: RgbImage,
    pub landmarks: LandmarkSet,
    pub alignment: Alignment,
}

pub struct FaceAligner {
    layout: LandmarkLayout,
    config: AlignmentConfig,
}

impl FaceAligner {
    pub fn new(layout: LandmarkLayout, config: AlignmentConfig) -> Self {
        Self { layout, config }
    }

    /// Levels the eye line and crops around the landmarks.
    ///
    /// Fails with `InvalidInput` when the eye indices cannot be resolved; it
    /// never falls back to an unrotated crop.
    pub fn align(&self, image: &RgbImage, landmarks: &LandmarkSet) -> Result<AlignedFace> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FaceContourError::invalid_input("image has zero size"));
        }
        landmarks.ensure_finite()?;
        let (left, right) = landmarks.eye_centers(&self.layout)?;
        let angle_degrees = (right.y - left.y).atan2(right.x - left.x).to_degrees();

        let (rotation, rotated) = if angle_degrees.abs() < f64::EPSILON {
            (IDENTITY, image.clone())
        } else {
            let center = ((image.width() / 2) as f64, (image.height() / 2) as f64);
            let rotation = rotation_matrix(center, angle_degrees);
            let fill = Rgb(self.config.fill_color);
            let rotated = warp(image, &projection(&rotation)?, Interpolation::Bicubic, fill);
            (rotation, rotated)
        };

        let rotated_landmarks = landmarks.map(|p| transform_point(&rotation, p));
        let crop_box = self.padded_box(&rotated_landmarks, rotated.width(), rotated.height())?;
        let cropped = crop(&rotated, &crop_box)?;
        let (dx, dy) = (crop_box.x_start as f64, crop_box.y_start as f64);
        let cropped_landmarks =
            rotated_landmarks.map(|p| LandmarkPoint::new(p.x - dx, p.y - dy));

        log::debug!(
            "Aligned face: angle {:.2} deg, crop {}x{} at ({}, {})",
            angle_degrees,
            crop_box.width(),
            crop_box.height(),
            crop_box.x_start,
            crop_box.y_start
        );

        Ok(AlignedFace {
            image: cropped,
            landmarks: cropped_landmarks,
            alignment: Alignment {
                angle_degrees,
                rotation,
                crop_box,
            },
        })
    }

    fn padded_box(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> Result<CropBox> {
        let (min_x, min_y, max_x, max_y) = landmarks
            .bounds()
            .ok_or_else(|| FaceContourError::invalid_input("no landmarks to crop around"))?;
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(FaceContourError::invalid_input(
                "landmark coordinates must be finite",
            ));
        }
        // Float math; far-off landmarks clamp to the image edge.
        let (x, y) = (min_x.floor(), min_y.floor());
        let w = max_x.floor() - x + 1.0;
        let h = max_y.floor() - y + 1.0;

        let c = &self.config;
        let pad_x = (c.horizontal_pad_ratio * w).trunc().max(c.min_horizontal_pad as f64);
        let pad_top = (c.top_pad_ratio * h).trunc().max(c.min_top_pad as f64);
        let pad_bottom = (c.bottom_pad_ratio * h).trunc().max(c.min_bottom_pad as f64);

        let x_start = (x - pad_x).max(0.0);
        let y_start = (y - pad_top).max(0.0);
        let x_end = (x + w + pad_x).min(width as f64);
        let y_end = (y + h + pad_bottom).min(height as f64);
        if !(x_end > x_start && y_end > y_start) {
            return Err(FaceContourError::invalid_input(
                "landmarks fall outside the image",
            ));
        }
        Ok(CropBox {
            x_start: x_start as u32,
            y_start: y_start as u32,
            x_end: x_end as u32,
            y_end: y_end as u32,
        })
    }
}

/// Counter-clockwise rotation by `angle_degrees` about `center` (y axis down).
pub fn rotation_matrix(center: (f64, f64), angle_degrees: f64) -> AffineMatrix {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let (cx, cy) = center;
    [
        [cos, sin, (1.0 - cos) * cx - sin * cy],
        [-sin, cos, sin * cx + (1.0 - cos) * cy],
    ]
}

pub fn transform_point(m: &AffineMatrix, p: &LandmarkPoint) -> LandmarkPoint {
    LandmarkPoint::new(
        m[0][0] * p.x + m[0][1] * p.y + m[0][2],
        m[1][0] * p.x + m[1][1] * p.y + m[1][2],
    )
}

fn projection(m: &AffineMatrix) -> Result<Projection> {
    Projection::from_matrix([
        m[0][0] as f32,
        m[0][1] as f32,
        m[0][2] as f32,
        m[1][0] as f32,
        m[1][1] as f32,
        m[1][2] as f32,
        0.0,
        0.0,
        1.0,
    ])
    .ok_or_else(|| FaceContourError::invalid_input("rotation matrix is not invertible"))
}

fn crop<P>(
    image: &image::ImageBuffer<P, Vec<P::Subpixel>>,
    crop_box: &CropBox,
) -> Result<image::ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: image::Pixel + 'static,
    P::Subpixel: 'static,
{
    if crop_box.x_end > image.width() || crop_box.y_end > image.height() {
        return Err(FaceContourError::invalid_input(format!(
            "crop box {crop_box:?} exceeds a {}x{} image",
            image.width(),
            image.height()
        )));
    }
    Ok(imageops::crop_imm(
        image,
        crop_box.x_start,
        crop_box.y_start,
        crop_box.width(),
        crop_box.height(),
    )
    .to_image())
}
