use std::time::Instant;

use image::{Rgb, RgbImage};

use crate::alignment::face_aligner::{AlignedFace, FaceAligner};
use crate::contours::contour_extractor::ContourExtractor;
use crate::contours::under_eye::under_eye_contour;
use crate::masking::mask_preparation::{isolate_color, prepare, rank_colors, MaskCleaner};
use crate::output::domain::output_generator::OutputGenerator;
use crate::output::domain::style::StyleConfiguration;
use crate::output::infrastructure::svg_generator::SvgGenerator;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::region_fan_out::{default_workers, fan_out};
use crate::rendering::overlay_renderer::OverlayRenderer;
use crate::shared::config::SegmentationConfig;
use crate::shared::contour::{Contour, RegionContourMap};
use crate::shared::error::{FaceContourError, Result};
use crate::shared::landmarks::LandmarkSet;
use crate::shared::mask::{RegionMask, SegmentationMask};
use crate::shared::region::{ExtractionStrategy, FaceRegion, Side};
use crate::subdivision::anatomical_subdivider::{AnatomicalSubdivider, Subdivision};

/// Everything one face run produces.
pub struct FaceProcessingResult {
    /// The transport-encoded output document.
    pub document: String,
    pub regions: RegionContourMap,
    /// The aligned image with region overlays and numbers composited on.
    pub overlay: RgbImage,
    pub aligned: AlignedFace,
}

/// Where a region's mask comes from before contour extraction.
enum RegionSource {
    Carved(RegionMask),
    Color { color: Rgb<u8>, under_eye: Option<Side> },
}

struct RegionJob {
    region: FaceRegion,
    source: RegionSource,
}

struct RegionOutcome {
    region: FaceRegion,
    overlay_mask: Option<RegionMask>,
    contour: Option<Contour>,
}

/// Single-face pipeline: validate → prepare mask → align → subdivide →
/// extract (fan-out) → overlay → generate.
pub struct ProcessFaceUseCase {
    config: SegmentationConfig,
    generator: Box<dyn OutputGenerator>,
    logger: Box<dyn PipelineLogger>,
    embed_background: bool,
    max_workers: usize,
}

impl ProcessFaceUseCase {
    pub fn new(
        config: SegmentationConfig,
        generator: Box<dyn OutputGenerator>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            config,
            generator,
            logger,
            embed_background: true,
            max_workers: default_workers(),
        }
    }

    /// Leaves the aligned image out of the output document.
    pub fn without_background(mut self) -> Self {
        self.embed_background = false;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Runs the whole pipeline on one face.
    ///
    /// Landmarks are validated before any mask work, so a short landmark set
    /// fails with `InvalidInput` rather than a downstream error.
    pub fn execute(
        &mut self,
        image: &RgbImage,
        mask: &SegmentationMask,
        landmarks: &LandmarkSet,
    ) -> Result<FaceProcessingResult> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FaceContourError::invalid_input("image has zero size"));
        }
        landmarks.ensure_layout(&self.config.landmark_layout)?;

        let start = Instant::now();
        let resized = prepare(mask, image.height(), image.width())?;
        let aligner = FaceAligner::new(
            self.config.landmark_layout.clone(),
            self.config.alignment.clone(),
        );
        let aligned = aligner.align(image, landmarks)?;
        let aligned_mask = aligned.alignment.apply_to_mask(&resized)?;
        self.stage("align", start);
        self.logger.info(&format!(
            "Aligned face {}x{} (rotated {:.2} deg)",
            aligned.image.width(),
            aligned.image.height(),
            aligned.alignment.angle_degrees
        ));

        let start = Instant::now();
        let (main_color, extras) = rank_colors(&aligned_mask).ok_or_else(|| {
            FaceContourError::NoFaceRegion("segmentation mask has no foreground color".into())
        })?;
        let cleaner = MaskCleaner::new(self.config.morphology.clone());
        let main = cleaner.clean(&isolate_color(&aligned_mask, main_color));
        let subdivision = AnatomicalSubdivider::new(&self.config).subdivide(&main, &aligned.landmarks)?;
        self.stage("subdivide", start);
        self.logger.metric("extra_colors", extras.len() as f64);

        let start = Instant::now();
        let jobs = self.plan(&subdivision, &extras);
        let outcomes = self.extract(jobs, &aligned_mask, &cleaner);
        self.stage("extract", start);

        let mut regions = RegionContourMap::new();
        let mut overlay_masks = Vec::new();
        for outcome in outcomes {
            if let Some(contour) = outcome.contour {
                regions.insert(outcome.region, contour);
            }
            if let Some(mask) = outcome.overlay_mask {
                overlay_masks.push((outcome.region, mask));
            }
        }
        self.logger.metric("regions", regions.len() as f64);
        self.logger.metric("contour_points", regions.total_points() as f64);

        let start = Instant::now();
        let overlay = OverlayRenderer::new(self.config.overlay.clone())
            .render(&aligned.image, &overlay_masks);
        self.stage("overlay", start);

        let start = Instant::now();
        let shape = (aligned.image.height(), aligned.image.width());
        let background = self.embed_background.then_some(&aligned.image);
        let document = self
            .generator
            .generate(shape, &regions, background)
            .map_err(|e| {
                let failure = match e {
                    FaceContourError::RenderingFailure { .. } => e,
                    other => FaceContourError::rendering(other.to_string()),
                };
                failure.with_completed_regions(regions.regions())
            })?;
        self.stage("generate", start);
        self.logger.info(&format!(
            "Generated {} document with {} regions",
            self.generator.format(),
            regions.len()
        ));
        self.logger.summary();

        Ok(FaceProcessingResult {
            document,
            regions,
            overlay,
            aligned,
        })
    }

    fn stage(&mut self, name: &str, start: Instant) {
        self.logger
            .timing(name, start.elapsed().as_secs_f64() * 1000.0);
    }

    /// One job per region whose source exists in this run.
    fn plan(&self, subdivision: &Subdivision, extras: &[Rgb<u8>]) -> Vec<RegionJob> {
        let mut jobs = Vec::new();
        for region in FaceRegion::ALL {
            let source = match self.config.strategy_for(region) {
                ExtractionStrategy::Carved => subdivision
                    .mask_for(region)
                    .map(|mask| RegionSource::Carved(mask.clone())),
                ExtractionStrategy::SegmentationColor { rank } => {
                    extras.get(rank).map(|&color| RegionSource::Color {
                        color,
                        under_eye: None,
                    })
                }
                ExtractionStrategy::UnderEyeCurve { rank, side } => {
                    extras.get(rank).map(|&color| RegionSource::Color {
                        color,
                        under_eye: Some(side),
                    })
                }
            };
            match source {
                Some(source) => jobs.push(RegionJob { region, source }),
                None => log::debug!("No source for {region} in this mask"),
            }
        }
        jobs
    }

    fn extract(
        &mut self,
        jobs: Vec<RegionJob>,
        aligned_mask: &SegmentationMask,
        cleaner: &MaskCleaner,
    ) -> Vec<RegionOutcome> {
        let extractor = ContourExtractor::new(self.config.contour.clone());
        let min_area = self.config.contour.min_region_area;
        let under_eye = &self.config.under_eye;
        let (width, height) = aligned_mask.dimensions();
        let logger = &mut self.logger;

        fan_out(
            jobs,
            self.max_workers,
            |job: RegionJob| {
                let region = job.region;
                match job.source {
                    RegionSource::Carved(mask) => RegionOutcome {
                        region,
                        contour: extractor.extract(&mask),
                        overlay_mask: (!mask.is_empty()).then_some(mask),
                    },
                    RegionSource::Color { color, under_eye: side } => {
                        let mask = cleaner.clean(&isolate_color(aligned_mask, color));
                        if mask.area() < min_area {
                            log::debug!("Skipping {region}: area {} below {min_area}", mask.area());
                            return RegionOutcome {
                                region,
                                overlay_mask: None,
                                contour: None,
                            };
                        }
                        let contour = match side {
                            Some(side) => under_eye_contour(width, height, side, under_eye),
                            None => extractor.extract(&mask),
                        };
                        RegionOutcome {
                            region,
                            overlay_mask: Some(mask),
                            contour,
                        }
                    }
                }
            },
            |done, total| logger.progress(done, total),
        )
    }
}

/// Runs the pipeline with default configuration, the default style and SVG
/// output, returning the encoded document and the contour map.
pub fn process_face(
    image: &RgbImage,
    mask: &SegmentationMask,
    landmarks: &LandmarkSet,
) -> Result<(String, RegionContourMap)> {
    let mut use_case = ProcessFaceUseCase::new(
        SegmentationConfig::default(),
        Box::new(SvgGenerator::new(StyleConfiguration::default())),
        Box::new(NullPipelineLogger),
    );
    let result = use_case.execute(image, mask, landmarks)?;
    Ok((result.document, result.regions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::domain::output_generator::{ImageShape, OutputFormat};
    use crate::output::infrastructure::encoding::from_base64;
    use crate::output::infrastructure::json_generator::JsonGenerator;
    use crate::shared::landmarks::LandmarkPoint;
    use approx::assert_relative_eq;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;
    use std::sync::{Arc, Mutex};

    // --- Fixtures ---

    const FACE: Rgb<u8> = Rgb([10, 10, 10]);
    const LEFT_EYE: Rgb<u8> = Rgb([40, 40, 40]);
    const RIGHT_EYE: Rgb<u8> = Rgb([50, 50, 50]);
    const NOSE: Rgb<u8> = Rgb([60, 60, 60]);

    /// dlib-style landmarks with level eyes spanning x 100..300, y 120..320.
    fn landmarks() -> LandmarkSet {
        let mut points = vec![LandmarkPoint::new(200.0, 250.0); 68];
        points[0] = LandmarkPoint::new(100.0, 120.0);
        points[1] = LandmarkPoint::new(300.0, 320.0);
        for k in 0..6 {
            points[36 + k] = LandmarkPoint::new(145.0 + k as f64 * 2.0, 170.0);
            points[42 + k] = LandmarkPoint::new(245.0 + k as f64 * 2.0, 170.0);
        }
        LandmarkSet::new(points)
    }

    /// Same landmarks with the right eye 10 px lower than the left.
    fn tilted_landmarks() -> LandmarkSet {
        let mut points = landmarks().points().to_vec();
        for k in 0..6 {
            points[36 + k] = LandmarkPoint::new(145.0 + k as f64 * 2.0, 165.0);
            points[42 + k] = LandmarkPoint::new(245.0 + k as f64 * 2.0, 175.0);
        }
        LandmarkSet::new(points)
    }

    fn image() -> RgbImage {
        RgbImage::from_fn(400, 400, |x, y| Rgb([(x % 200) as u8, (y % 200) as u8, 120]))
    }

    /// Face circle plus brow, hair and feature blobs, ranked by gray value.
    fn mask() -> SegmentationMask {
        let mut img = RgbImage::new(400, 400);
        draw_filled_circle_mut(&mut img, (200, 200), 120, FACE);
        draw_filled_rect_mut(&mut img, Rect::at(140, 140).of_size(30, 8), Rgb([20, 20, 20]));
        draw_filled_rect_mut(&mut img, Rect::at(230, 140).of_size(30, 8), Rgb([30, 30, 30]));
        draw_filled_circle_mut(&mut img, (150, 170), 12, LEFT_EYE);
        draw_filled_circle_mut(&mut img, (250, 170), 12, RIGHT_EYE);
        draw_filled_rect_mut(&mut img, Rect::at(185, 190).of_size(30, 40), NOSE);
        SegmentationMask::new(img)
    }

    fn use_case() -> ProcessFaceUseCase {
        ProcessFaceUseCase::new(
            SegmentationConfig::default(),
            Box::new(SvgGenerator::new(StyleConfiguration::default())),
            Box::new(NullPipelineLogger),
        )
    }

    fn decoded(document: &str) -> String {
        String::from_utf8(from_base64(document).unwrap()).unwrap()
    }

    struct FailingGenerator;

    impl OutputGenerator for FailingGenerator {
        fn format(&self) -> OutputFormat {
            OutputFormat::Svg
        }

        fn generate(
            &self,
            _image_shape: ImageShape,
            _regions: &RegionContourMap,
            _background: Option<&RgbImage>,
        ) -> Result<String> {
            Err(FaceContourError::invalid_input("boom"))
        }
    }

    struct RecordingLogger {
        stages: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn progress(&mut self, _current: usize, _total: usize) {}
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.stages.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    // --- Validation ---

    #[test]
    fn test_short_landmarks_fail_before_masking() {
        let short = LandmarkSet::new(vec![
            LandmarkPoint::new(100.0, 100.0),
            LandmarkPoint::new(200.0, 100.0),
        ]);
        // An empty mask would be NoFaceRegion if masking ran first.
        let empty = SegmentationMask::new(RgbImage::new(400, 400));
        let err = use_case().execute(&image(), &empty, &short).err().unwrap();
        assert!(matches!(err, FaceContourError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_size_image_is_invalid() {
        let err = use_case()
            .execute(&RgbImage::new(0, 0), &mask(), &landmarks())
            .err()
            .unwrap();
        assert!(matches!(err, FaceContourError::InvalidInput(_)));
    }

    #[test]
    fn test_background_only_mask_is_no_face_region() {
        let empty = SegmentationMask::new(RgbImage::new(400, 400));
        let err = use_case().execute(&image(), &empty, &landmarks()).err().unwrap();
        assert!(matches!(err, FaceContourError::NoFaceRegion(_)));
    }

    // --- Regions ---

    #[test]
    fn test_regions_come_from_each_strategy() {
        let result = use_case().execute(&image(), &mask(), &landmarks()).unwrap();
        let regions = &result.regions;
        assert!(regions.contains(FaceRegion::Forehead));
        assert!(regions.contains(FaceRegion::Chin));
        assert!(regions.contains(FaceRegion::Nose));
        assert!(regions.contains(FaceRegion::LeftEye));
        assert!(regions.contains(FaceRegion::RightEye));
        assert!(!regions.contains(FaceRegion::Lips));
        assert!(regions.iter().all(|(_, c)| c.len() >= 3));
    }

    #[test]
    fn test_eye_contours_are_under_eye_curves() {
        let result = use_case().execute(&image(), &mask(), &landmarks()).unwrap();
        let (w, h) = result.aligned.image.dimensions();
        let config = SegmentationConfig::default();
        let expected = under_eye_contour(w, h, Side::Left, &config.under_eye).unwrap();
        assert_eq!(result.regions.get(FaceRegion::LeftEye), Some(&expected));
    }

    #[test]
    fn test_tilted_face_keeps_image_and_mask_registered() {
        // Red marker painted exactly where the mask carries the nose label.
        let mut photo = RgbImage::from_pixel(400, 400, Rgb([120, 120, 120]));
        draw_filled_rect_mut(&mut photo, Rect::at(185, 190).of_size(30, 40), Rgb([255, 0, 0]));

        let result = use_case().execute(&photo, &mask(), &tilted_landmarks()).unwrap();
        assert!(result.aligned.alignment.is_rotated());
        assert!(result.regions.contains(FaceRegion::Forehead));
        assert!(result.regions.contains(FaceRegion::Chin));

        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
        for (x, y, p) in result.aligned.image.enumerate_pixels() {
            if p[0] > 200 && p[1] < 60 && p[2] < 60 {
                sx += x as f64;
                sy += y as f64;
                n += 1.0;
            }
        }
        assert!(n > 900.0);
        let (marker_x, marker_y) = (sx / n, sy / n);

        let (nose_x, nose_y) = result
            .regions
            .get(FaceRegion::Nose)
            .unwrap()
            .centroid()
            .unwrap();
        assert_relative_eq!(nose_x, marker_x, epsilon = 2.0);
        assert_relative_eq!(nose_y, marker_y, epsilon = 2.0);

        let aligned_mask = result.aligned.alignment.apply_to_mask(&mask()).unwrap();
        assert_eq!(aligned_mask.dimensions(), result.aligned.image.dimensions());
        assert_eq!(
            aligned_mask.as_image().get_pixel(marker_x as u32, marker_y as u32),
            &NOSE
        );
    }

    #[test]
    fn test_mask_is_resized_to_the_image() {
        let small = SegmentationMask::new(image::imageops::resize(
            mask().as_image(),
            200,
            200,
            image::imageops::FilterType::Nearest,
        ));
        let result = use_case().execute(&image(), &small, &landmarks()).unwrap();
        assert!(result.regions.contains(FaceRegion::Forehead));
    }

    #[test]
    fn test_single_worker_matches_parallel_run() {
        let parallel = use_case().execute(&image(), &mask(), &landmarks()).unwrap();
        let serial = use_case()
            .with_max_workers(1)
            .execute(&image(), &mask(), &landmarks())
            .unwrap();
        assert_eq!(parallel.regions, serial.regions);
        assert_eq!(parallel.document, serial.document);
    }

    // --- Outputs ---

    #[test]
    fn test_document_matches_aligned_shape() {
        let result = use_case().execute(&image(), &mask(), &landmarks()).unwrap();
        assert_eq!(result.aligned.image.dimensions(), (281, 311));
        let svg = decoded(&result.document);
        assert!(svg.starts_with(r#"<svg width="281" height="311""#));
        assert!(svg.contains("background-image"));
        assert!(svg.contains(r#"class="region-1""#));
    }

    #[test]
    fn test_without_background_omits_image() {
        let result = use_case()
            .without_background()
            .execute(&image(), &mask(), &landmarks())
            .unwrap();
        assert!(!decoded(&result.document).contains("<image"));
    }

    #[test]
    fn test_overlay_tints_the_aligned_image() {
        let result = use_case().execute(&image(), &mask(), &landmarks()).unwrap();
        assert_eq!(result.overlay.dimensions(), result.aligned.image.dimensions());
        assert_ne!(result.overlay, result.aligned.image);
    }

    #[test]
    fn test_json_generator_is_pluggable() {
        let mut uc = ProcessFaceUseCase::new(
            SegmentationConfig::default(),
            Box::new(JsonGenerator),
            Box::new(NullPipelineLogger),
        );
        let result = uc.execute(&image(), &mask(), &landmarks()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&decoded(&result.document)).unwrap();
        assert_eq!(value["regions"]["forehead"]["id"], 1);
    }

    #[test]
    fn test_generation_failure_carries_completed_regions() {
        let mut uc = ProcessFaceUseCase::new(
            SegmentationConfig::default(),
            Box::new(FailingGenerator),
            Box::new(NullPipelineLogger),
        );
        let err = uc.execute(&image(), &mask(), &landmarks()).err().unwrap();
        match err {
            FaceContourError::RenderingFailure {
                completed_regions, ..
            } => assert!(completed_regions.contains(&FaceRegion::Forehead)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stages_are_timed_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let mut uc = ProcessFaceUseCase::new(
            SegmentationConfig::default(),
            Box::new(SvgGenerator::new(StyleConfiguration::minimal())),
            Box::new(RecordingLogger {
                stages: stages.clone(),
            }),
        );
        uc.execute(&image(), &mask(), &landmarks()).unwrap();
        assert_eq!(
            *stages.lock().unwrap(),
            vec!["align", "subdivide", "extract", "overlay", "generate"]
        );
    }

    #[test]
    fn test_process_face_returns_svg_and_map() {
        let (document, regions) = process_face(&image(), &mask(), &landmarks()).unwrap();
        assert!(decoded(&document).contains("<path"));
        assert!(regions.contains(FaceRegion::Forehead));
    }
}
