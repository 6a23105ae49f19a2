use imageproc::contours::find_contours;
use imageproc::geometry::approximate_polygon_dp;

use crate::shared::config::ContourConfig;
use crate::shared::contour::Contour;
use crate::shared::mask::RegionMask;

/// Outer borders of every top-level component (holes are not traced).
pub fn external_contours(mask: &RegionMask) -> Vec<Contour> {
    find_contours::<i32>(mask.as_image())
        .into_iter()
        .filter(|c| c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// The external contour enclosing the largest area. Ties keep the first traced.
pub fn largest_external_contour(mask: &RegionMask) -> Option<Contour> {
    external_contours(mask)
        .into_iter()
        .fold(None, |best: Option<Contour>, c| match best {
            Some(b) if b.area() >= c.area() => Some(b),
            _ => Some(c),
        })
}

/// Turns a region mask into one simplified outline.
#[derive(Clone, Debug)]
pub struct ContourExtractor {
    config: ContourConfig,
}

impl ContourExtractor {
    pub fn new(config: ContourConfig) -> Self {
        Self { config }
    }

    /// Largest external contour, simplified within
    /// `simplify_tolerance_ratio * arc length`.
    ///
    /// Returns `None` for empty, sub-threshold or degenerate regions; these
    /// are expected and are not errors.
    pub fn extract(&self, mask: &RegionMask) -> Option<Contour> {
        let contour = largest_external_contour(mask)?;
        let area = contour.area();
        if area < self.config.min_region_area as f64 {
            log::debug!(
                "Contour area {:.1} below minimum {}",
                area,
                self.config.min_region_area
            );
            return None;
        }
        let simplified = self.simplify(&contour);
        if !simplified.is_closed_polygon() {
            log::debug!("Contour collapsed to {} points", simplified.len());
            return None;
        }
        Some(simplified)
    }

    /// Douglas-Peucker over the ring; a non-positive tolerance keeps every point.
    fn simplify(&self, contour: &Contour) -> Contour {
        let epsilon = self.config.simplify_tolerance_ratio * contour.arc_length();
        if epsilon <= 0.0 || !contour.is_closed_polygon() {
            return contour.clone();
        }
        Contour::new(approximate_polygon_dp(contour.points(), epsilon, true))
    }
}

impl Default for ContourExtractor {
    fn default() -> Self {
        Self::new(ContourConfig::default())
    }
}
