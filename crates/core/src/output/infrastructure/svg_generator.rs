//! Vector document: one closed path and one centered number per region.

use image::RgbImage;

use crate::output::domain::output_generator::{
    label_position, validate_inputs, ImageShape, OutputFormat, OutputGenerator,
};
use crate::output::domain::style::{RegionStyle, StyleConfiguration};
use crate::shared::contour::{Contour, RegionContourMap};
use crate::shared::error::Result;
use crate::shared::region::FaceRegion;

use super::encoding::{png_bytes, to_base64};

pub struct SvgGenerator {
    style: StyleConfiguration,
}

impl SvgGenerator {
    pub fn new(style: StyleConfiguration) -> Self {
        Self { style }
    }

    /// The SVG text before transport encoding.
    pub fn render(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<String> {
        validate_inputs(image_shape, background)?;
        let (height, width) = image_shape;

        let mut svg = String::with_capacity(4096);
        svg.push_str(&format!(
            r#"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}">"#
        ));
        svg.push('\n');

        if let Some(bg) = background {
            svg.push_str(&format!(
                r#"  <image href="data:image/png;base64,{}" x="0" y="0" width="{width}" height="{height}" class="background-image"/>"#,
                to_base64(&png_bytes(bg)?)
            ));
            svg.push('\n');
        }

        for (region, contour) in regions.iter() {
            let style = self.style.style_for(region);
            push_path(&mut svg, region, contour, style);
            if let Some((x, y)) = label_position(region, contour) {
                push_label(&mut svg, region, x, y, style);
            }
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

impl OutputGenerator for SvgGenerator {
    fn format(&self) -> OutputFormat {
        OutputFormat::Svg
    }

    fn generate(
        &self,
        image_shape: ImageShape,
        regions: &RegionContourMap,
        background: Option<&RgbImage>,
    ) -> Result<String> {
        let svg = self.render(image_shape, regions, background)?;
        Ok(to_base64(svg.as_bytes()))
    }
}

/// `M x,y L x,y ... Z` for a closed contour.
pub fn path_data(contour: &Contour) -> String {
    let mut d = String::new();
    for (i, p) in contour.points().iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        d.push_str(&format!("{}{},{}", if i == 0 { 'M' } else { 'L' }, p.x, p.y));
    }
    d.push_str(" Z");
    d
}

fn push_path(svg: &mut String, region: FaceRegion, contour: &Contour, style: &RegionStyle) {
    let dash = style
        .stroke_dasharray
        .as_deref()
        .map(|d| format!(r#" stroke-dasharray="{}""#, escape_attr(d)))
        .unwrap_or_default();
    svg.push_str(&format!(
        r#"  <path d="{}" stroke="{}" stroke-width="{}" fill="{}" fill-opacity="{}"{} class="region-{}"/>"#,
        path_data(contour),
        style.stroke,
        style.stroke_width,
        style.fill,
        style.fill_opacity,
        dash,
        region.id()
    ));
    svg.push('\n');
}

fn push_label(svg: &mut String, region: FaceRegion, x: i32, y: i32, style: &RegionStyle) {
    svg.push_str(&format!(
        r#"  <text x="{x}" y="{y}" fill="{}" font-size="{}" text-anchor="middle" dominant-baseline="middle" class="region-label-{id}">{id}</text>"#,
        style.text_color,
        style.font_size,
        id = region.id()
    ));
    svg.push('\n');
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
