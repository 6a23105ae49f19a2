use std::path::Path;

use image::{ColorType, DynamicImage, RgbImage};

use crate::shared::error::{FaceContourError, Result};
use crate::shared::mask::SegmentationMask;

fn decode(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).map_err(|source| FaceContourError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Loads the photo to process as 8-bit RGB.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = decode(path)?;
    log::debug!("Loaded image {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image.to_rgb8())
}

/// Loads a segmentation map. Color maps are kept as-is; single-channel label
/// maps are expanded so label `v` becomes color `(v, v, v)`.
pub fn load_mask(path: &Path) -> Result<SegmentationMask> {
    let image = decode(path)?;
    let mask = match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            SegmentationMask::from_labels(&image.to_luma8())
        }
        _ => SegmentationMask::new(image.to_rgb8()),
    };
    log::debug!("Loaded mask {} ({}x{})", path.display(), mask.width(), mask.height());
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    #[test]
    fn test_load_image_round_trips_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let img = RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]));
        img.save(&path).unwrap();

        assert_eq!(load_image(&path).unwrap(), img);
    }

    #[test]
    fn test_gray_mask_becomes_label_colors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.png");
        let mut labels = GrayImage::new(4, 4);
        labels.put_pixel(1, 1, Luma([7]));
        labels.save(&path).unwrap();

        let mask = load_mask(&path).unwrap();
        assert_eq!(mask.as_image().get_pixel(1, 1), &Rgb([7, 7, 7]));
        assert_eq!(mask.distinct_colors(), vec![Rgb([0, 0, 0]), Rgb([7, 7, 7])]);
    }

    #[test]
    fn test_color_mask_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.png");
        RgbImage::from_pixel(3, 3, Rgb([9, 80, 200])).save(&path).unwrap();

        let mask = load_mask(&path).unwrap();
        assert_eq!(mask.distinct_colors(), vec![Rgb([9, 80, 200])]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_image(Path::new("/nonexistent/face.png")).unwrap_err();
        assert!(matches!(err, FaceContourError::Io { .. }));
    }

    #[test]
    fn test_garbage_file_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(load_image(&path).unwrap_err(), FaceContourError::Image(_)));
    }
}
