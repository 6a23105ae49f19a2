//! Closed polygon boundaries and the per-run region -> contour map.

use std::collections::BTreeMap;

use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use super::region::FaceRegion;

/// Minimum number of points for a usable closed contour.
pub const MIN_CONTOUR_POINTS: usize = 3;

/// Closed boundary of one region in aligned-image pixel coordinates.
///
/// The closing edge from the last point back to the first is implicit; a
/// trailing copy of the first point is dropped on construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<[i32; 2]>", into = "Vec<[i32; 2]>")]
pub struct Contour {
    points: Vec<Point<i32>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Contour {
    pub fn new(mut points: Vec<Point<i32>>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    pub fn from_pairs(pairs: &[[i32; 2]]) -> Self {
        Self::new(pairs.iter().map(|&[x, y]| Point::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the contour has enough points to bound an area.
    pub fn is_closed_polygon(&self) -> bool {
        self.points.len() >= MIN_CONTOUR_POINTS
    }

    fn edges(&self) -> impl Iterator<Item = (Point<i32>, Point<i32>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    pub fn area(&self) -> f64 {
        contour_area(&self.points)
    }

    /// Closed perimeter length.
    pub fn arc_length(&self) -> f64 {
        arc_length(&self.points, true)
    }

    /// Area-weighted centroid from boundary moments; the arithmetic mean of
    /// the points when the polygon has no area.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let mut m00 = 0.0;
        let mut m10 = 0.0;
        let mut m01 = 0.0;
        if self.points.len() >= MIN_CONTOUR_POINTS {
            for (a, b) in self.edges() {
                let (xi, yi, xj, yj) = (a.x as f64, a.y as f64, b.x as f64, b.y as f64);
                let cross = xi * yj - xj * yi;
                m00 += cross;
                m10 += (xi + xj) * cross;
                m01 += (yi + yj) * cross;
            }
            m00 /= 2.0;
            m10 /= 6.0;
            m01 /= 6.0;
        }
        if m00.abs() > f64::EPSILON {
            return Some((m10 / m00, m01 / m00));
        }
        let n = self.points.len() as f64;
        let sx: f64 = self.points.iter().map(|p| p.x as f64).sum();
        let sy: f64 = self.points.iter().map(|p| p.y as f64).sum();
        Some((sx / n, sy / n))
    }

    /// Centroid truncated to whole pixels, as used for label placement.
    pub fn label_anchor(&self) -> Option<(i32, i32)> {
        self.centroid().map(|(x, y)| (x as i32, y as i32))
    }

    /// Inclusive pixel bounding box (`width = max_x - min_x + 1`).
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }
}

impl From<Vec<[i32; 2]>> for Contour {
    fn from(pairs: Vec<[i32; 2]>) -> Self {
        Contour::from_pairs(&pairs)
    }
}

impl From<Contour> for Vec<[i32; 2]> {
    fn from(contour: Contour) -> Self {
        contour.points.iter().map(|p| [p.x, p.y]).collect()
    }
}

/// Region id -> contour, ordered by id so every consumer iterates the same way.
///
/// Only contours with at least three points are ever stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionContourMap {
    contours: BTreeMap<FaceRegion, Contour>,
}

impl RegionContourMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the contour, returning `false` (and storing nothing) when it is degenerate.
    pub fn insert(&mut self, region: FaceRegion, contour: Contour) -> bool {
        if !contour.is_closed_polygon() {
            return false;
        }
        self.contours.insert(region, contour);
        true
    }

    pub fn get(&self, region: FaceRegion) -> Option<&Contour> {
        self.contours.get(&region)
    }

    pub fn contains(&self, region: FaceRegion) -> bool {
        self.contours.contains_key(&region)
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FaceRegion, &Contour)> {
        self.contours.iter().map(|(r, c)| (*r, c))
    }

    pub fn regions(&self) -> Vec<FaceRegion> {
        self.contours.keys().copied().collect()
    }

    pub fn total_points(&self) -> usize {
        self.contours.values().map(Contour::len).sum()
    }
}

impl FromIterator<(FaceRegion, Contour)> for RegionContourMap {
    fn from_iter<I: IntoIterator<Item = (FaceRegion, Contour)>>(iter: I) -> Self {
        let mut map = RegionContourMap::new();
        for (region, contour) in iter {
            map.insert(region, contour);
        }
        map
    }
}
