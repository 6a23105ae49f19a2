use std::path::PathBuf;

use thiserror::Error;

use super::region::FaceRegion;

/// Failures the engine raises to its caller.
///
/// Degenerate sub-regions are not errors: they are simply absent from the
/// resulting [`RegionContourMap`](super::contour::RegionContourMap).
#[derive(Error, Debug)]
pub enum FaceContourError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no face region: {0}")]
    NoFaceRegion(String),
    #[error("rendering failed: {reason} (completed regions: {completed_regions:?})")]
    RenderingFailure {
        reason: String,
        completed_regions: Vec<FaceRegion>,
    },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl FaceContourError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn rendering(reason: impl Into<String>) -> Self {
        Self::RenderingFailure {
            reason: reason.into(),
            completed_regions: Vec::new(),
        }
    }

    /// Attaches the regions that were finished before a rendering failure.
    pub fn with_completed_regions(self, regions: Vec<FaceRegion>) -> Self {
        match self {
            Self::RenderingFailure { reason, .. } => Self::RenderingFailure {
                reason,
                completed_regions: regions,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, FaceContourError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_completed_regions_fills_rendering_failure() {
        let err = FaceContourError::rendering("png encoder")
            .with_completed_regions(vec![FaceRegion::Forehead, FaceRegion::Chin]);
        match err {
            FaceContourError::RenderingFailure {
                reason,
                completed_regions,
            } => {
                assert_eq!(reason, "png encoder");
                assert_eq!(completed_regions, vec![FaceRegion::Forehead, FaceRegion::Chin]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_with_completed_regions_leaves_other_variants() {
        let err = FaceContourError::invalid_input("bad shape").with_completed_regions(vec![]);
        assert!(matches!(err, FaceContourError::InvalidInput(_)));
    }

    #[test]
    fn test_display_messages() {
        let err = FaceContourError::NoFaceRegion("empty mask".into());
        assert_eq!(err.to_string(), "no face region: empty mask");
    }
}
