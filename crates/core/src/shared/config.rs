//! Tunables for one processing run.
//!
//! Ratios are relative to the face bounding box. Pixel thresholds
//! (`ear_min_width`, `min_region_area`, label offsets) are tuned for aligned
//! crops roughly 400-900 px wide and should be scaled for other resolutions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use super::error::{FaceContourError, Result};
use super::landmarks::LandmarkLayout;
use super::region::{ExtractionStrategy, FaceRegion};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub landmark_layout: LandmarkLayout,
    pub alignment: AlignmentConfig,
    pub morphology: MorphologyConfig,
    pub anatomy: AnatomyConfig,
    pub contour: ContourConfig,
    pub under_eye: UnderEyeConfig,
    pub overlay: OverlayConfig,
    /// Overrides the default segmentation color rank of mask-derived regions.
    pub color_ranks: BTreeMap<FaceRegion, usize>,
    pub carve_cheeks: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            landmark_layout: LandmarkLayout::default(),
            alignment: AlignmentConfig::default(),
            morphology: MorphologyConfig::default(),
            anatomy: AnatomyConfig::default(),
            contour: ContourConfig::default(),
            under_eye: UnderEyeConfig::default(),
            overlay: OverlayConfig::default(),
            color_ranks: BTreeMap::new(),
            carve_cheeks: false,
        }
    }
}

impl SegmentationConfig {
    /// `<platform config dir>/facecontour/config.json`.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// The user's config file when present and readable, else defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path().filter(|p| p.exists()) else {
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| FaceContourError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FaceContourError::invalid_input(format!("config not serializable: {e}")))?;
        fs::write(path, json).map_err(|source| FaceContourError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The region's extraction strategy with any configured rank override applied.
    pub fn strategy_for(&self, region: FaceRegion) -> ExtractionStrategy {
        let strategy = region.strategy();
        let Some(&rank) = self.color_ranks.get(&region) else {
            return strategy;
        };
        match strategy {
            ExtractionStrategy::Carved => ExtractionStrategy::Carved,
            ExtractionStrategy::SegmentationColor { .. } => {
                ExtractionStrategy::SegmentationColor { rank }
            }
            ExtractionStrategy::UnderEyeCurve { side, .. } => {
                ExtractionStrategy::UnderEyeCurve { rank, side }
            }
        }
    }
}

/// Padding around the rotated landmark box: `max(ratio * size, minimum)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub horizontal_pad_ratio: f64,
    pub min_horizontal_pad: u32,
    pub top_pad_ratio: f64,
    pub min_top_pad: u32,
    pub bottom_pad_ratio: f64,
    pub min_bottom_pad: u32,
    pub fill_color: [u8; 3],
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            horizontal_pad_ratio: 0.2,
            min_horizontal_pad: 30,
            top_pad_ratio: 0.4,
            min_top_pad: 50,
            bottom_pad_ratio: 0.15,
            min_bottom_pad: 20,
            fill_color: [224, 224, 224],
        }
    }
}

/// Structuring element radii (L1 norm): radius 1 is a 3x3 cross, 2 a 5x5 diamond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub small_radius: u8,
    pub small_close_iterations: u8,
    pub large_radius: u8,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            small_radius: 1,
            small_close_iterations: 2,
            large_radius: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnatomyConfig {
    pub forehead_height_ratio: f64,
    pub ear_search_start_ratio: f64,
    pub ear_search_end_ratio: f64,
    pub ear_sample_step: u32,
    pub face_width_center_ratio: f64,
    pub face_width_scale: f64,
    pub ear_min_width: u32,
    pub chin_start_ratio: f64,
}

impl Default for AnatomyConfig {
    fn default() -> Self {
        Self {
            forehead_height_ratio: 0.30,
            ear_search_start_ratio: 0.3,
            ear_search_end_ratio: 0.8,
            ear_sample_step: 5,
            face_width_center_ratio: 0.65,
            face_width_scale: 1.39,
            ear_min_width: 20,
            chin_start_ratio: 0.66,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Regions (masks and contours) below this many pixels are absent.
    pub min_region_area: usize,
    /// Douglas-Peucker tolerance as a fraction of the closed arc length.
    pub simplify_tolerance_ratio: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_region_area: 16,
            simplify_tolerance_ratio: 0.002,
        }
    }
}

/// Placement of the synthetic under-eye half-ellipse, relative to the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnderEyeConfig {
    pub center_y_ratio: f64,
    pub left_center_x_ratio: f64,
    pub right_center_x_ratio: f64,
    pub semi_axis_x_ratio: f64,
    pub semi_axis_y_ratio: f64,
    pub sweep_step_degrees: u32,
}

impl Default for UnderEyeConfig {
    fn default() -> Self {
        Self {
            center_y_ratio: 0.5,
            left_center_x_ratio: 1.0 / 3.0,
            right_center_x_ratio: 0.68,
            semi_axis_x_ratio: 1.0 / 16.0,
            semi_axis_y_ratio: 1.0 / 20.0,
            sweep_step_degrees: 10,
        }
    }
}

/// How one region is composited onto the overlay raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOverlay {
    pub color: [u8; 3],
    pub dotted: bool,
    pub scale_x: f64,
    pub scale_y: f64,
    pub shift_cm: f64,
    pub label_offset_x: i32,
}

impl Default for RegionOverlay {
    fn default() -> Self {
        Self {
            color: DEFAULT_OVERLAY_COLOR,
            dotted: false,
            scale_x: 1.0,
            scale_y: 1.0,
            shift_cm: 0.0,
            label_offset_x: 0,
        }
    }
}

pub const DEFAULT_OVERLAY_COLOR: [u8; 3] = [0, 0, 255];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub flat_opacity: f64,
    pub dotted_opacity: f64,
    pub dot_spacing: u32,
    pub dot_radius: i32,
    pub dpi: f64,
    pub label_color: [u8; 3],
    pub label_scale: u32,
    /// Regions drawn on the overlay raster. Regions not listed are not drawn.
    pub regions: BTreeMap<FaceRegion, RegionOverlay>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let plain = RegionOverlay::default();
        let under_eye = RegionOverlay {
            scale_x: 1.2,
            shift_cm: 1.2,
            ..RegionOverlay::default()
        };
        let regions = BTreeMap::from([
            (FaceRegion::Forehead, plain.clone()),
            (FaceRegion::LeftEar, plain.clone()),
            (FaceRegion::RightEar, plain.clone()),
            (
                FaceRegion::Chin,
                RegionOverlay {
                    label_offset_x: 150,
                    ..plain.clone()
                },
            ),
            (FaceRegion::Nose, plain),
            (FaceRegion::LeftEye, under_eye.clone()),
            (FaceRegion::RightEye, under_eye),
        ]);
        Self {
            flat_opacity: 0.3,
            dotted_opacity: 0.1,
            dot_spacing: 8,
            dot_radius: 2,
            dpi: 96.0,
            label_color: [255, 255, 255],
            label_scale: 4,
            regions,
        }
    }
}

/// Reads a JSON file into `T`; malformed content is `InvalidInput`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).map_err(|source| FaceContourError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json)
        .map_err(|e| FaceContourError::invalid_input(format!("{}: {e}", path.display())))
}
