//! Facial landmark points and the index conventions used to find the eyes.

use serde::{Deserialize, Serialize};

use super::error::{FaceContourError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which landmark indices make up each eye.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkLayout {
    pub left_eye: Vec<usize>,
    pub right_eye: Vec<usize>,
}

impl LandmarkLayout {
    /// The 68-point dlib convention: left eye 36-41, right eye 42-47.
    pub fn dlib68() -> Self {
        Self {
            left_eye: (36..42).collect(),
            right_eye: (42..48).collect(),
        }
    }

    /// MediaPipe face mesh: eye corners 33/133 and 362/263.
    pub fn mediapipe468() -> Self {
        Self {
            left_eye: vec![33, 133],
            right_eye: vec![362, 263],
        }
    }

    /// Minimum landmark count for every eye index to resolve.
    pub fn required_len(&self) -> usize {
        self.left_eye
            .iter()
            .chain(&self.right_eye)
            .max()
            .map_or(0, |max| max + 1)
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::dlib68()
    }
}

/// An immutable, index-addressed set of landmarks.
///
/// Transformations return new sets; the original is never aliased.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<LandmarkPoint>,
}

impl LandmarkSet {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fails unless every index of `layout` resolves.
    pub fn ensure_layout(&self, layout: &LandmarkLayout) -> Result<()> {
        let required = layout.required_len();
        if self.points.len() < required || required == 0 {
            return Err(FaceContourError::invalid_input(format!(
                "need at least {required} landmarks to locate the eyes, got {}",
                self.points.len()
            )));
        }
        Ok(())
    }

    /// Fails on the first NaN or infinite coordinate.
    pub fn ensure_finite(&self) -> Result<()> {
        match self
            .points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            Some(i) => Err(FaceContourError::invalid_input(format!(
                "landmark {i} has a non-finite coordinate"
            ))),
            None => Ok(()),
        }
    }

    /// Mean position of the points at `indices`.
    pub fn centroid_of(&self, indices: &[usize]) -> Result<LandmarkPoint> {
        if indices.is_empty() {
            return Err(FaceContourError::invalid_input("empty landmark index group"));
        }
        let mut sx = 0.0;
        let mut sy = 0.0;
        for &i in indices {
            let p = self.points.get(i).ok_or_else(|| {
                FaceContourError::invalid_input(format!(
                    "landmark index {i} out of range ({} landmarks)",
                    self.points.len()
                ))
            })?;
            sx += p.x;
            sy += p.y;
        }
        let n = indices.len() as f64;
        Ok(LandmarkPoint::new(sx / n, sy / n))
    }

    /// Left and right eye centers for `layout`.
    pub fn eye_centers(&self, layout: &LandmarkLayout) -> Result<(LandmarkPoint, LandmarkPoint)> {
        self.ensure_layout(layout)?;
        Ok((
            self.centroid_of(&layout.left_eye)?,
            self.centroid_of(&layout.right_eye)?,
        ))
    }

    pub fn map(&self, f: impl Fn(&LandmarkPoint) -> LandmarkPoint) -> Self {
        Self::new(self.points.iter().map(f).collect())
    }

    /// `(min_x, min_y, max_x, max_y)` over all points, `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        ))
    }
}

impl From<Vec<LandmarkPoint>> for LandmarkSet {
    fn from(points: Vec<LandmarkPoint>) -> Self {
        Self::new(points)
    }
}
