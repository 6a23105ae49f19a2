//! Carves the main face mask into forehead, ears, chin and (optionally)
//! cheeks using bounding-box ratios.
//!
//! Forehead, both ears and the residual face never share a pixel: every
//! carved mask is a subset of the main mask, ears exclude the forehead, and
//! the residual is what remains after subtracting all three.

use crate::masking::mask_preparation::MaskCleaner;
use crate::shared::config::{AnatomyConfig, SegmentationConfig};
use crate::shared::error::Result;
use crate::shared::landmarks::{LandmarkLayout, LandmarkSet};
use crate::shared::mask::RegionMask;
use crate::shared::region::FaceRegion;

use super::face_boundaries::FaceBoundaries;

#[derive(Clone, Debug)]
pub struct Subdivision {
    pub boundaries: FaceBoundaries,
    pub forehead: RegionMask,
    pub left_ear: RegionMask,
    pub right_ear: RegionMask,
    pub chin: RegionMask,
    pub left_cheek: Option<RegionMask>,
    pub right_cheek: Option<RegionMask>,
    pub residual: RegionMask,
}

impl Subdivision {
    /// The carved mask for `region`, if subdivision produces one.
    pub fn mask_for(&self, region: FaceRegion) -> Option<&RegionMask> {
        match region {
            FaceRegion::Forehead => Some(&self.forehead),
            FaceRegion::LeftEar => Some(&self.left_ear),
            FaceRegion::RightEar => Some(&self.right_ear),
            FaceRegion::Chin => Some(&self.chin),
            FaceRegion::LeftCheek => self.left_cheek.as_ref(),
            FaceRegion::RightCheek => self.right_cheek.as_ref(),
            _ => None,
        }
    }
}

/// Horizontal extent of the face core, outside of which mask runs count as ear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Corridor {
    left: i64,
    right: i64,
}

pub struct AnatomicalSubdivider {
    anatomy: AnatomyConfig,
    layout: LandmarkLayout,
    cleaner: MaskCleaner,
    min_region_area: usize,
    carve_cheeks: bool,
}

impl AnatomicalSubdivider {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            anatomy: config.anatomy.clone(),
            layout: config.landmark_layout.clone(),
            cleaner: MaskCleaner::new(config.morphology.clone()),
            min_region_area: config.contour.min_region_area,
            carve_cheeks: config.carve_cheeks,
        }
    }

    pub fn subdivide(&self, main: &RegionMask, landmarks: &LandmarkSet) -> Result<Subdivision> {
        let boundaries = FaceBoundaries::measure(main, landmarks, &self.layout)?;
        log::debug!(
            "Face bbox {:?}, centroid ({:.1}, {:.1}), eye level {:?}",
            boundaries.bbox,
            boundaries.centroid.0,
            boundaries.centroid.1,
            boundaries.eye_level
        );

        let forehead = self.forehead(main, &boundaries);
        let (left_ear, right_ear) = self.ears(main, &boundaries);
        let left_ear = left_ear.subtract(&forehead);
        let right_ear = right_ear.subtract(&forehead).subtract(&left_ear);

        let carved = main
            .subtract(&forehead)
            .subtract(&left_ear)
            .subtract(&right_ear);
        let chin = self.chin(&carved, &boundaries);
        let (left_cheek, right_cheek) = if self.carve_cheeks {
            let (l, r) = self.cheeks(&carved, &boundaries);
            (Some(l), Some(r))
        } else {
            (None, None)
        };
        let residual = self.cleaner.open_small(&carved);

        log::debug!(
            "Subdivision areas: forehead {}, left ear {}, right ear {}, chin {}, residual {}",
            forehead.area(),
            left_ear.area(),
            right_ear.area(),
            chin.area(),
            residual.area()
        );

        Ok(Subdivision {
            boundaries,
            forehead,
            left_ear,
            right_ear,
            chin,
            left_cheek,
            right_cheek,
            residual,
        })
    }

    fn forehead(&self, main: &RegionMask, b: &FaceBoundaries) -> RegionMask {
        let bottom = b.row_at(self.anatomy.forehead_height_ratio);
        main.restrict_rect(b.left(), b.top(), b.left() + b.width(), bottom)
            .largest_component()
    }

    fn ears(&self, main: &RegionMask, b: &FaceBoundaries) -> (RegionMask, RegionMask) {
        let (w, h) = main.dimensions();
        let mut left = RegionMask::new(w, h);
        let mut right = RegionMask::new(w, h);

        let start = b.row_at(self.anatomy.ear_search_start_ratio);
        let end = b.row_at(self.anatomy.ear_search_end_ratio).min(h);
        let Some(corridor) = self.corridor(main, start, end) else {
            return (left, right);
        };
        let min_width = self.anatomy.ear_min_width as i64;

        for y in start..end {
            let Some((row_left, row_right, _)) = main.row_span(y) else {
                continue;
            };
            let (row_left, row_right) = (row_left as i64, row_right as i64);
            if row_left < corridor.left && corridor.left - row_left >= min_width {
                for x in row_left..corridor.left.min(row_right + 1) {
                    if main.contains(x as u32, y) {
                        left.set(x as u32, y);
                    }
                }
            }
            if row_right > corridor.right && row_right - corridor.right >= min_width {
                for x in corridor.right.max(row_left)..=row_right {
                    if main.contains(x as u32, y) {
                        right.set(x as u32, y);
                    }
                }
            }
        }

        (self.clean_ear(&left), self.clean_ear(&right))
    }

    /// Averages sampled row profiles in `start..end` into the face core.
    fn corridor(&self, main: &RegionMask, start: u32, end: u32) -> Option<Corridor> {
        let step = self.anatomy.ear_sample_step.max(1) as usize;
        let profiles: Vec<(u32, u32, u32)> = (start..end)
            .step_by(step)
            .filter_map(|y| main.row_span(y))
            .collect();
        if profiles.is_empty() {
            return None;
        }
        let n = profiles.len() as f64;
        let mean = |f: fn(&(u32, u32, u32)) -> u32| {
            (profiles.iter().map(|p| f(p) as f64).sum::<f64>() / n) as i64
        };
        let avg_left = mean(|p| p.0);
        let avg_right = mean(|p| p.1);
        let avg_width = mean(|p| p.2);

        let central_width = (avg_width as f64
            * self.anatomy.face_width_center_ratio
            * self.anatomy.face_width_scale) as i64;
        let margin = (avg_width - central_width).div_euclid(2);
        Some(Corridor {
            left: avg_left + margin,
            right: avg_right - margin,
        })
    }

    fn clean_ear(&self, ear: &RegionMask) -> RegionMask {
        let largest = self.cleaner.open_small(ear).largest_component();
        if largest.area() > self.min_region_area {
            largest
        } else {
            RegionMask::new(ear.width(), ear.height())
        }
    }

    fn chin(&self, carved: &RegionMask, b: &FaceBoundaries) -> RegionMask {
        let start = b.row_at(self.anatomy.chin_start_ratio).max(b.top());
        let rows = carved.restrict_rows(start, b.top() + b.height());
        if rows.is_empty() {
            return rows;
        }
        self.cleaner.clean_region(&rows, self.min_region_area)
    }

    /// Eye level (or the forehead line) down to the chin line, split at the
    /// centroid column.
    fn cheeks(&self, carved: &RegionMask, b: &FaceBoundaries) -> (RegionMask, RegionMask) {
        let forehead_line = b.row_at(self.anatomy.forehead_height_ratio);
        let top = b
            .eye_level
            .map(|y| y.max(0.0) as u32)
            .unwrap_or(forehead_line)
            .max(forehead_line);
        let bottom = b.row_at(self.anatomy.chin_start_ratio);
        let split = b.centroid.0.max(0.0) as u32;
        let (w, _) = carved.dimensions();

        let band = carved.restrict_rows(top, bottom);
        let left = band.restrict_rect(0, top, split, bottom);
        let right = band.restrict_rect(split, top, w, bottom);
        let clean = |m: RegionMask| {
            if m.is_empty() {
                m
            } else {
                self.cleaner.clean_region(&m, self.min_region_area)
            }
        };
        (clean(left), clean(right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::FaceContourError;
    use crate::shared::landmarks::LandmarkPoint;
    use image::{GrayImage, Luma};
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn six_landmarks() -> LandmarkSet {
        LandmarkSet::new(vec![
            LandmarkPoint::new(110.0, 130.0),
            LandmarkPoint::new(130.0, 130.0),
            LandmarkPoint::new(170.0, 130.0),
            LandmarkPoint::new(190.0, 130.0),
            LandmarkPoint::new(150.0, 170.0),
            LandmarkPoint::new(150.0, 200.0),
        ])
    }

    fn circle(size: u32, center: (i32, i32), r: i32) -> GrayImage {
        let mut img = GrayImage::new(size, size);
        draw_filled_circle_mut(&mut img, center, r, Luma([255]));
        img
    }

    fn face_with_ears() -> RegionMask {
        let mut img = circle(300, (150, 150), 80);
        draw_filled_rect_mut(&mut img, Rect::at(40, 130).of_size(36, 50), Luma([255]));
        draw_filled_rect_mut(&mut img, Rect::at(225, 130).of_size(36, 50), Luma([255]));
        RegionMask::from_image(img)
    }

    fn subdivider(config: SegmentationConfig) -> AnatomicalSubdivider {
        AnatomicalSubdivider::new(&config)
    }

    fn overlap(a: &RegionMask, b: &RegionMask) -> usize {
        a.intersect(b).area()
    }

    // ── Forehead ────────────────────────────────────────────────

    #[test]
    fn test_circle_forehead_occupies_top_of_bbox() {
        let main = RegionMask::from_image(circle(300, (150, 150), 100));
        let sub = subdivider(SegmentationConfig::default())
            .subdivide(&main, &six_landmarks())
            .unwrap();
        assert!(!sub.forehead.is_empty());
        let limit = sub.boundaries.row_at(0.30);
        for y in limit..300 {
            assert!(sub.forehead.row_span(y).is_none(), "forehead leaks into row {y}");
        }
        assert!(sub.forehead.row_span(sub.boundaries.top() + 5).is_some());
    }

    // ── Ears ────────────────────────────────────────────────────

    #[test]
    fn test_ears_are_found_outside_corridor() {
        let sub = subdivider(SegmentationConfig::default())
            .subdivide(&face_with_ears(), &six_landmarks())
            .unwrap();
        assert!(!sub.left_ear.is_empty());
        assert!(!sub.right_ear.is_empty());
        assert!(sub.left_ear.contains(50, 155));
        assert!(sub.right_ear.contains(250, 155));
        assert!(!sub.left_ear.contains(150, 155));
    }

    #[test]
    fn test_round_face_has_no_ears() {
        let main = RegionMask::from_image(circle(300, (150, 150), 100));
        let sub = subdivider(SegmentationConfig::default())
            .subdivide(&main, &six_landmarks())
            .unwrap();
        assert!(sub.left_ear.is_empty());
        assert!(sub.right_ear.is_empty());
    }

    // ── Invariants ──────────────────────────────────────────────

    #[test]
    fn test_carved_regions_never_overlap() {
        for main in [face_with_ears(), RegionMask::from_image(circle(300, (150, 150), 100))] {
            let sub = subdivider(SegmentationConfig::default())
                .subdivide(&main, &six_landmarks())
                .unwrap();
            let parts = [&sub.forehead, &sub.left_ear, &sub.right_ear, &sub.residual];
            for (i, a) in parts.iter().enumerate() {
                assert_eq!(a.subtract(&main).area(), 0);
                for b in &parts[i + 1..] {
                    assert_eq!(overlap(a, b), 0);
                }
            }
        }
    }

    #[test]
    fn test_chin_sits_in_lower_third() {
        let main = RegionMask::from_image(circle(300, (150, 150), 100));
        let sub = subdivider(SegmentationConfig::default())
            .subdivide(&main, &six_landmarks())
            .unwrap();
        assert!(!sub.chin.is_empty());
        let chin_top = sub.boundaries.row_at(0.66);
        for y in 0..chin_top.saturating_sub(3) {
            assert!(sub.chin.row_span(y).is_none(), "chin reaches row {y}");
        }
    }

    #[test]
    fn test_empty_main_mask_is_no_face_region() {
        let err = subdivider(SegmentationConfig::default())
            .subdivide(&RegionMask::new(50, 50), &six_landmarks())
            .unwrap_err();
        assert!(matches!(err, FaceContourError::NoFaceRegion(_)));
    }

    // ── Cheeks ──────────────────────────────────────────────────

    #[test]
    fn test_cheeks_only_when_enabled() {
        let main = RegionMask::from_image(circle(300, (150, 150), 100));
        let off = subdivider(SegmentationConfig::default())
            .subdivide(&main, &six_landmarks())
            .unwrap();
        assert!(off.left_cheek.is_none());

        let config = SegmentationConfig {
            carve_cheeks: true,
            ..SegmentationConfig::default()
        };
        let on = subdivider(config).subdivide(&main, &six_landmarks()).unwrap();
        let left = on.left_cheek.unwrap();
        let right = on.right_cheek.unwrap();
        assert!(left.contains(100, 150));
        assert!(right.contains(200, 150));
        assert_eq!(overlap(&left, &right), 0);
    }

    #[test]
    fn test_mask_for_maps_carved_regions() {
        let main = face_with_ears();
        let sub = subdivider(SegmentationConfig::default())
            .subdivide(&main, &six_landmarks())
            .unwrap();
        assert_eq!(sub.mask_for(FaceRegion::Forehead), Some(&sub.forehead));
        assert_eq!(sub.mask_for(FaceRegion::RightEar), Some(&sub.right_ear));
        assert!(sub.mask_for(FaceRegion::LeftCheek).is_none());
        assert!(sub.mask_for(FaceRegion::Nose).is_none());
    }
}
