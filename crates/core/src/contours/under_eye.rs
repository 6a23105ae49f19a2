//! Synthetic under-eye curve used in place of the traced eye regions.

use imageproc::point::Point;

use crate::shared::config::UnderEyeConfig;
use crate::shared::contour::Contour;
use crate::shared::region::Side;

fn scaled(size: u32, ratio: f64) -> i32 {
    (size as f64 * ratio + 1e-9).floor() as i32
}

/// Lower half of an ellipse (a "U"), closed along its horizontal diameter.
///
/// The center sits at `center_y_ratio` of the height and at
/// `left_center_x_ratio` / `right_center_x_ratio` of the width. Returns
/// `None` when the image is too small for the curve to enclose any area.
pub fn under_eye_contour(
    width: u32,
    height: u32,
    side: Side,
    config: &UnderEyeConfig,
) -> Option<Contour> {
    let cx = match side {
        Side::Left => scaled(width, config.left_center_x_ratio),
        Side::Right => scaled(width, config.right_center_x_ratio),
    };
    let cy = scaled(height, config.center_y_ratio);
    let ax = scaled(width, config.semi_axis_x_ratio) as f64;
    let ay = scaled(height, config.semi_axis_y_ratio) as f64;
    let step = config.sweep_step_degrees.clamp(1, 180) as usize;

    let mut points: Vec<Point<i32>> = Vec::new();
    for deg in (0..=180).step_by(step) {
        let (sin, cos) = (deg as f64).to_radians().sin_cos();
        let p = Point::new(cx + (ax * cos).round() as i32, cy + (ay * sin).round() as i32);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }

    let contour = Contour::new(points);
    (contour.is_closed_polygon() && contour.area() > 0.0).then_some(contour)
}
