//! 3x5 bitmap digits for stamping region numbers onto rasters.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        _ => [0x7, 0x7, 0x7, 0x7, 0x7],
    }
}

/// Pixel size of `text` at `scale`: 3 columns plus 1 spacing per glyph.
pub fn measure(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    ((GLYPH_WIDTH + 1) * scale * n - scale, GLYPH_HEIGHT * scale)
}

/// Draws `text` with its box centered on `center`; pixels off the canvas are clipped.
pub fn draw_centered(image: &mut RgbImage, text: &str, center: (i32, i32), color: Rgb<u8>, scale: u32) {
    let scale = scale.max(1);
    let (w, h) = measure(text, scale);
    let mut x = center.0 - (w / 2) as i32;
    let y = center.1 - (h / 2) as i32;
    for c in text.chars() {
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    let px = x + (col * scale) as i32;
                    let py = y + (row as u32 * scale) as i32;
                    draw_filled_rect_mut(image, Rect::at(px, py).of_size(scale, scale), color);
                }
            }
        }
        x += ((GLYPH_WIDTH + 1) * scale) as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn lit(image: &RgbImage) -> usize {
        image.pixels().filter(|p| **p == WHITE).count()
    }

    #[test]
    fn test_measure() {
        assert_eq!(measure("1", 2), (6, 10));
        assert_eq!(measure("12", 1), (7, 5));
        assert_eq!(measure("", 3), (0, 0));
    }

    #[test]
    fn test_one_is_drawn_centered() {
        let mut img = RgbImage::new(21, 21);
        draw_centered(&mut img, "1", (10, 10), WHITE, 1);
        // Rows of "1" light 1, 2, 1, 1 and 3 cells.
        assert_eq!(lit(&img), 8);
        assert_eq!(img.get_pixel(10, 8), &WHITE);
        assert_eq!(img.get_pixel(9, 12), &WHITE);
    }

    #[test]
    fn test_scale_multiplies_area() {
        let mut img = RgbImage::new(60, 60);
        draw_centered(&mut img, "8", (30, 30), WHITE, 3);
        assert_eq!(lit(&img), 13 * 9);
    }

    #[test]
    fn test_label_near_edge_is_clipped() {
        let mut img = RgbImage::new(4, 4);
        draw_centered(&mut img, "10", (0, 0), WHITE, 2);
        assert!(lit(&img) > 0);
    }
}
