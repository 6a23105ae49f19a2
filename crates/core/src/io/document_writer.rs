use std::path::Path;

use image::RgbImage;

use crate::output::infrastructure::encoding::from_base64;
use crate::shared::error::{FaceContourError, Result};

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| FaceContourError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Writes an encoded document, decoding it to raw bytes unless `keep_base64`.
pub fn write_document(path: &Path, document: &str, keep_base64: bool) -> Result<()> {
    ensure_parent(path)?;
    let bytes = if keep_base64 {
        document.as_bytes().to_vec()
    } else {
        from_base64(document)?
    };
    std::fs::write(path, &bytes).map_err(|source| FaceContourError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Saves a raster (e.g. the overlay preview); the format follows the extension.
pub fn write_image(path: &Path, image: &RgbImage) -> Result<()> {
    ensure_parent(path)?;
    image.save(path)?;
    log::info!("Wrote {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}
