//! Canonical facial region enumeration.
//!
//! Every region has one stable integer id. Carved regions come from the
//! anatomical subdivision of the main face mask; the rest are isolated from
//! extra segmentation colors, ranked by sorted color order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the image a paired region sits on (image left, not subject left).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// How a region's contour is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Carved geometrically out of the main face mask.
    Carved,
    /// Isolated from the `rank`-th extra segmentation color.
    SegmentationColor { rank: usize },
    /// The extra color must be present, but the contour is a synthetic
    /// half-ellipse under the eye.
    UnderEyeCurve { rank: usize, side: Side },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FaceRegion {
    Forehead,
    LeftEye,
    RightEye,
    Chin,
    Nose,
    RightEar,
    LeftEar,
    Lips,
    InnerMouth,
    LeftCheek,
    RightCheek,
    Mouth,
}

impl FaceRegion {
    pub const ALL: [FaceRegion; 12] = [
        FaceRegion::Forehead,
        FaceRegion::LeftEye,
        FaceRegion::RightEye,
        FaceRegion::Chin,
        FaceRegion::Nose,
        FaceRegion::RightEar,
        FaceRegion::LeftEar,
        FaceRegion::Lips,
        FaceRegion::InnerMouth,
        FaceRegion::LeftCheek,
        FaceRegion::RightCheek,
        FaceRegion::Mouth,
    ];

    pub fn id(self) -> u8 {
        match self {
            FaceRegion::Forehead => 1,
            FaceRegion::LeftEye => 2,
            FaceRegion::RightEye => 3,
            FaceRegion::Chin => 4,
            FaceRegion::Nose => 5,
            FaceRegion::RightEar => 6,
            FaceRegion::LeftEar => 7,
            FaceRegion::Lips => 8,
            FaceRegion::InnerMouth => 9,
            FaceRegion::LeftCheek => 10,
            FaceRegion::RightCheek => 11,
            FaceRegion::Mouth => 12,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            FaceRegion::Forehead => "forehead",
            FaceRegion::LeftEye => "left_eye",
            FaceRegion::RightEye => "right_eye",
            FaceRegion::Chin => "chin",
            FaceRegion::Nose => "nose",
            FaceRegion::RightEar => "right_ear",
            FaceRegion::LeftEar => "left_ear",
            FaceRegion::Lips => "lips",
            FaceRegion::InnerMouth => "inner_mouth",
            FaceRegion::LeftCheek => "left_cheek",
            FaceRegion::RightCheek => "right_cheek",
            FaceRegion::Mouth => "mouth",
        }
    }

    /// Default extraction strategy. Ranks index the extra segmentation
    /// colors (every color that is neither background nor the main face).
    pub fn strategy(self) -> ExtractionStrategy {
        match self {
            FaceRegion::Forehead
            | FaceRegion::Chin
            | FaceRegion::LeftEar
            | FaceRegion::RightEar
            | FaceRegion::LeftCheek
            | FaceRegion::RightCheek => ExtractionStrategy::Carved,
            FaceRegion::LeftEye => ExtractionStrategy::UnderEyeCurve {
                rank: 2,
                side: Side::Left,
            },
            FaceRegion::RightEye => ExtractionStrategy::UnderEyeCurve {
                rank: 3,
                side: Side::Right,
            },
            FaceRegion::Nose => ExtractionStrategy::SegmentationColor { rank: 4 },
            FaceRegion::Lips => ExtractionStrategy::SegmentationColor { rank: 5 },
            FaceRegion::Mouth => ExtractionStrategy::SegmentationColor { rank: 6 },
            FaceRegion::InnerMouth => ExtractionStrategy::SegmentationColor { rank: 7 },
        }
    }
}

impl fmt::Display for FaceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

impl From<FaceRegion> for u8 {
    fn from(region: FaceRegion) -> Self {
        region.id()
    }
}

impl TryFrom<u8> for FaceRegion {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        FaceRegion::from_id(id).ok_or_else(|| format!("unknown region id {id}"))
    }
}
