use crate::contours::contour_extractor::largest_external_contour;
use crate::shared::contour::BoundingBox;
use crate::shared::error::{FaceContourError, Result};
use crate::shared::landmarks::{LandmarkLayout, LandmarkSet};
use crate::shared::mask::RegionMask;

/// Geometry of the main face region that every carving ratio refers to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBoundaries {
    pub bbox: BoundingBox,
    pub centroid: (f64, f64),
    /// Mean y of both eye centers, when the layout's eye indices resolve.
    pub eye_level: Option<f64>,
}

impl FaceBoundaries {
    /// Measures the largest external contour of `main`.
    ///
    /// Fails with `NoFaceRegion` when the mask has no contour at all.
    pub fn measure(
        main: &RegionMask,
        landmarks: &LandmarkSet,
        layout: &LandmarkLayout,
    ) -> Result<Self> {
        let contour = largest_external_contour(main).ok_or_else(|| {
            FaceContourError::NoFaceRegion("main face mask has no contour".into())
        })?;
        let bbox = contour
            .bounding_box()
            .ok_or_else(|| FaceContourError::NoFaceRegion("main face contour is empty".into()))?;

        let bbox_center = (
            bbox.x as f64 + bbox.width as f64 / 2.0,
            bbox.y as f64 + bbox.height as f64 / 2.0,
        );
        let centroid = if contour.area() > 0.0 {
            contour.centroid().unwrap_or(bbox_center)
        } else {
            bbox_center
        };

        let eye_level = if landmarks.len() >= layout.required_len() {
            landmarks
                .eye_centers(layout)
                .ok()
                .map(|(left, right)| (left.y + right.y) / 2.0)
        } else {
            None
        };

        Ok(Self {
            bbox,
            centroid,
            eye_level,
        })
    }

    pub fn left(&self) -> u32 {
        self.bbox.x.max(0) as u32
    }

    pub fn top(&self) -> u32 {
        self.bbox.y.max(0) as u32
    }

    pub fn width(&self) -> u32 {
        self.bbox.width.max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.bbox.height.max(0) as u32
    }

    /// Row `ratio` of the way down the bounding box.
    pub fn row_at(&self, ratio: f64) -> u32 {
        self.top() + (self.height() as f64 * ratio) as u32
    }
}
