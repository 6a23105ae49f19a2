use std::path::Path;

use serde::Deserialize;

use crate::shared::error::{FaceContourError, Result};
use crate::shared::landmarks::{LandmarkPoint, LandmarkSet};

/// One landmark as either `{"x": .., "y": ..}` or `[x, y]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkEntry {
    Point(LandmarkPoint),
    Pair([f64; 2]),
}

impl From<LandmarkEntry> for LandmarkPoint {
    fn from(entry: LandmarkEntry) -> Self {
        match entry {
            LandmarkEntry::Point(p) => p,
            LandmarkEntry::Pair([x, y]) => LandmarkPoint::new(x, y),
        }
    }
}

/// A bare list, or an object carrying the list under `landmarks`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkDocument {
    List(Vec<LandmarkEntry>),
    Wrapped { landmarks: Vec<LandmarkEntry> },
}

pub fn parse_landmarks(json: &str) -> Result<LandmarkSet> {
    let document: LandmarkDocument = serde_json::from_str(json)
        .map_err(|e| FaceContourError::invalid_input(format!("malformed landmarks: {e}")))?;
    let entries = match document {
        LandmarkDocument::List(entries) | LandmarkDocument::Wrapped { landmarks: entries } => entries,
    };
    Ok(LandmarkSet::new(entries.into_iter().map(Into::into).collect()))
}

pub fn load_landmarks(path: &Path) -> Result<LandmarkSet> {
    let json = std::fs::read_to_string(path).map_err(|source| FaceContourError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let landmarks = parse_landmarks(&json)?;
    log::debug!("Loaded {} landmarks from {}", landmarks.len(), path.display());
    Ok(landmarks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::objects(r#"[{"x": 1.0, "y": 2.0}, {"x": 3.5, "y": 4.0}]"#)]
    #[case::pairs("[[1, 2], [3.5, 4]]")]
    #[case::mixed(r#"[[1, 2], {"x": 3.5, "y": 4}]"#)]
    #[case::wrapped(r#"{"landmarks": [[1, 2], [3.5, 4]]}"#)]
    fn test_accepted_shapes(#[case] json: &str) {
        let set = parse_landmarks(json).unwrap();
        assert_eq!(
            set.points(),
            [LandmarkPoint::new(1.0, 2.0), LandmarkPoint::new(3.5, 4.0)]
        );
    }

    #[rstest]
    #[case::not_json("landmarks")]
    #[case::short_pair("[[1]]")]
    #[case::missing_y(r#"[{"x": 1}]"#)]
    fn test_malformed_is_invalid_input(#[case] json: &str) {
        assert!(matches!(
            parse_landmarks(json).unwrap_err(),
            FaceContourError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landmarks.json");
        std::fs::write(&path, "[[10, 20], [30, 40], [50, 60]]").unwrap();
        assert_eq!(load_landmarks(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_landmarks(Path::new("/nonexistent/landmarks.json")).unwrap_err();
        assert!(matches!(err, FaceContourError::Io { .. }));
    }
}
