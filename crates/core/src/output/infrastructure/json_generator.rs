//! Structured metadata document: per-region geometry plus coverage statistics.

use std::collections::BTreeMap;

use image::RgbImage;
use serde::Serialize;

use crate::output::domain::output_generator::{
    validate_inputs, ImageShape, OutputFormat, OutputGenerator,
};
use crate::shared::contour::{BoundingBox, Contour, RegionContourMap};
use crate::shared::error::{FaceContourError, Result};

use super::encoding::to_base64;

#[derive(Debug, Serialize)]
pub struct MetadataDocument {
    pub metadata: Metadata,
    pub regions: BTreeMap<String, RegionMetadata>,
    pub statistics: Statistics,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub image_width: u32,
    pub image_height: u32,
    pub total_regions: usize,
    pub format: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RegionMetadata {
    pub id: u8,
    pub contour_points: Contour,
    pub centroid: Option<[f64; 2]>,
    pub area: f64,
    pub point_count: usize,
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Serialize)]
pub struct Statistics {
    pub total_contour_points: usize,
    pub total_region_area: f64,
    pub image_area: u64,
    pub coverage_percentage: f64,
    pub average_points_per_region: f64,
}

/// Builds the metadata tree; the background raster is not represented.
pub fn build_metadata(image_shape: ImageShape, regions: &RegionContourMap) -> MetadataDocument {
    let (height, width) = image_shape;
    let entries: BTreeMap<String, RegionMetadata> = regions
        .iter()
        .map(|(region, contour)| {
            let meta = RegionMetadata {
                id: region.id(),
                contour_points: contour.clone(),
                centroid: contour.centroid().map(|(x, y)| [x, y]),
                area: contour.area(),
                point_count: contour.len(),
                bounding_box: contour.bounding_box(),
            };
            (region.name().to_string(), meta)
        })
        .collect();

    let total_region_area: f64 = entries.values().map(|m| m.area).sum();
    let image_area = width as u64 * height as u64;
    let total_contour_points = regions.total_points();
    let statistics = Statistics {
        total_contour_points,
        total_region_area,
        image_area,
        coverage_percentage: total_region_area / image_area as f64 * 100.0,
        average_points_per_region: if regions.is_empty() {
            0.0
        } else {
            total_contour_points as f64 / regions.len() as f64
        },
    };

    MetadataDocument {
        metadata: Metadata {
            image_width: width,
            image_height: height,
            total_regions: regions.len(),
            format: "json",
        },
        regions: entries,
        statistics,
    }
}

pub struct JsonGenerator;

impl JsonGenerator {
    /// Pretty-printed JSON before transport encoding.
    pub fn render(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<String> {
        validate_inputs(image_shape, background)?;
        serde_json::to_string_pretty(&build_metadata(image_shape, regions))
            .map_err(|e| FaceContourError::rendering(format!("metadata serialization failed: {e}")))
    }
}

impl OutputGenerator for JsonGenerator {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn generate(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<String> {
        let json = self.render(image_shape, regions, background)?;
        Ok(to_base64(json.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::infrastructure::encoding::from_base64;
    use crate::shared::region::FaceRegion;
    use approx::assert_relative_eq;

    fn two_regions() -> RegionContourMap {
        [
            (
                FaceRegion::Forehead,
                Contour::from_pairs(&[[0, 0], [10, 0], [10, 10], [0, 10]]),
            ),
            (
                FaceRegion::Chin,
                Contour::from_pairs(&[[20, 20], [40, 20], [30, 40]]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_statistics() {
        let doc = build_metadata((100, 50), &two_regions());
        assert_eq!(doc.metadata.total_regions, 2);
        assert_eq!(doc.statistics.total_contour_points, 7);
        assert_eq!(doc.statistics.image_area, 5000);
        assert_relative_eq!(doc.statistics.total_region_area, 300.0);
        assert_relative_eq!(doc.statistics.coverage_percentage, 6.0);
        assert_relative_eq!(doc.statistics.average_points_per_region, 3.5);
    }

    #[test]
    fn test_regions_keyed_by_name() {
        let json = JsonGenerator.render((100, 100), &two_regions(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["format"], "json");
        assert_eq!(value["regions"]["forehead"]["id"], 1);
        assert_eq!(value["regions"]["chin"]["id"], 4);
        assert_eq!(value["regions"]["forehead"]["point_count"], 4);
        assert_eq!(value["regions"]["forehead"]["contour_points"][1][0], 10);
        assert_eq!(value["regions"]["forehead"]["bounding_box"]["width"], 11);
        assert_eq!(value["regions"]["forehead"]["centroid"][0], 5.0);
    }

    #[test]
    fn test_generate_is_base64_of_render() {
        let regions = two_regions();
        let encoded = JsonGenerator.generate((100, 100), &regions, None).unwrap();
        let decoded = String::from_utf8(from_base64(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, JsonGenerator.render((100, 100), &regions, None).unwrap());
        assert_eq!(encoded, JsonGenerator.generate((100, 100), &regions, None).unwrap());
    }

    #[test]
    fn test_empty_map_has_zero_average() {
        let doc = build_metadata((10, 10), &RegionContourMap::new());
        assert_eq!(doc.statistics.average_points_per_region, 0.0);
        assert!(doc.regions.is_empty());
    }
}
