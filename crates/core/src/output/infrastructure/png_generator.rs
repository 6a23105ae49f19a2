//! Raster document: filled, outlined and numbered regions over the background.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::output::domain::output_generator::{
    label_position, validate_inputs, ImageShape, OutputFormat, OutputGenerator,
};
use crate::output::domain::style::{RegionStyle, StyleConfiguration};
use crate::rendering::digit_font;
use crate::shared::contour::{Contour, RegionContourMap};
use crate::shared::error::Result;
use crate::shared::mask::RegionMask;

use super::encoding::{png_bytes, to_base64};

pub struct PngGenerator {
    style: StyleConfiguration,
}

impl PngGenerator {
    pub fn new(style: StyleConfiguration) -> Self {
        Self { style }
    }

    /// The composed raster before encoding.
    pub fn render(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<RgbImage> {
        validate_inputs(image_shape, background)?;
        let (height, width) = image_shape;
        let mut canvas = match background {
            Some(bg) => bg.clone(),
            None => RgbImage::new(width, height),
        };

        for (region, contour) in regions.iter() {
            let style = self.style.style_for(region);
            fill(&mut canvas, contour, style);
            outline(&mut canvas, contour, style);
            if let Some(anchor) = label_position(region, contour) {
                let scale = (style.font_size / 5).max(1);
                digit_font::draw_centered(
                    &mut canvas,
                    &region.id().to_string(),
                    anchor,
                    Rgb(style.text_color.to_array()),
                    scale,
                );
            }
        }
        Ok(canvas)
    }
}

impl OutputGenerator for PngGenerator {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn generate(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<String> {
        let canvas = self.render(image_shape, regions, background)?;
        Ok(to_base64(&png_bytes(&canvas)?))
    }
}

fn fill(canvas: &mut RgbImage, contour: &Contour, style: &RegionStyle) {
    let mask = RegionMask::from_contour(contour, canvas.width(), canvas.height());
    let alpha = style.fill_opacity.clamp(0.0, 1.0);
    let color = style.fill.to_array();
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if mask.contains(x, y) {
            for c in 0..3 {
                let v = pixel[c] as f64 * (1.0 - alpha) + color[c] as f64 * alpha;
                pixel[c] = v.round() as u8;
            }
        }
    }
}

fn outline(canvas: &mut RgbImage, contour: &Contour, style: &RegionStyle) {
    let color = Rgb(style.stroke.to_array());
    let points = contour.points();
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::domain::style::Color;
    use crate::output::infrastructure::encoding::from_base64;
    use crate::shared::region::FaceRegion;

    fn square_map() -> RegionContourMap {
        [(
            FaceRegion::Nose,
            Contour::from_pairs(&[[10, 10], [60, 10], [60, 60], [10, 60]]),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_region_is_filled_outlined_and_labelled() {
        let style = StyleConfiguration::colorful();
        let canvas = PngGenerator::new(style.clone())
            .render((100, 100), &square_map(), None)
            .unwrap();
        let nose = style.style_for(FaceRegion::Nose);
        assert_eq!(canvas.get_pixel(10, 30), &Rgb(nose.stroke.to_array()));
        // 0.3 of #FFEAA7 over black.
        assert_eq!(canvas.get_pixel(20, 50), &Rgb([77, 70, 50]));
        assert_eq!(canvas.get_pixel(35, 35), &Rgb(Color::WHITE.to_array()));
        assert_eq!(canvas.get_pixel(80, 80), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_generate_returns_decodable_png() {
        let encoded = PngGenerator::new(StyleConfiguration::default_theme())
            .generate((100, 120), &square_map(), None)
            .unwrap();
        let decoded = image::load_from_memory(&from_base64(&encoded).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 100));
    }

    #[test]
    fn test_background_is_used_as_canvas() {
        let bg = RgbImage::from_pixel(100, 100, Rgb([40, 40, 40]));
        let canvas = PngGenerator::new(StyleConfiguration::minimal())
            .render((100, 100), &RegionContourMap::new(), Some(&bg))
            .unwrap();
        assert_eq!(canvas, bg);
    }
}
