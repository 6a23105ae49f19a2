//! Per-region visual styling for generated documents.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::config::read_json;
use crate::shared::error::Result;
use crate::shared::region::FaceRegion;

/// Opaque RGB color, written as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid color '{s}', expected #RRGGBB"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("invalid color '{s}', expected #RRGGBB"))
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionStyle {
    pub stroke: Color,
    pub fill: Color,
    pub fill_opacity: f64,
    pub stroke_width: f64,
    pub stroke_dasharray: Option<String>,
    pub font_size: u32,
    pub text_color: Color,
}

impl Default for RegionStyle {
    fn default() -> Self {
        Self {
            stroke: Color::BLACK,
            fill: Color::BLACK,
            fill_opacity: 0.2,
            stroke_width: 2.0,
            stroke_dasharray: None,
            font_size: 26,
            text_color: Color::WHITE,
        }
    }
}

/// Region -> style lookup with a fallback for unmapped regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfiguration {
    pub regions: BTreeMap<FaceRegion, RegionStyle>,
    pub default: RegionStyle,
}

impl Default for StyleConfiguration {
    fn default() -> Self {
        Self::default_theme()
    }
}

impl StyleConfiguration {
    pub fn style_for(&self, region: FaceRegion) -> &RegionStyle {
        self.regions.get(&region).unwrap_or(&self.default)
    }

    /// Dashed purple outlines; the forehead is slightly darker.
    pub fn default_theme() -> Self {
        let base = RegionStyle {
            stroke: Color::rgb(0xA1, 0x6A, 0xA9),
            fill: Color::rgb(161, 106, 169),
            fill_opacity: 0.5,
            stroke_width: 2.0,
            stroke_dasharray: Some("5,5".to_string()),
            font_size: 26,
            text_color: Color::WHITE,
        };
        let regions = (1..=9)
            .filter_map(FaceRegion::from_id)
            .map(|region| {
                let stroke = if region == FaceRegion::Forehead {
                    Color::rgb(0x9D, 0x57, 0xA7)
                } else {
                    base.stroke
                };
                (region, RegionStyle { stroke, ..base.clone() })
            })
            .collect();
        Self {
            regions,
            default: RegionStyle::default(),
        }
    }

    /// One saturated color per region.
    pub fn colorful() -> Self {
        let palette = [
            (FaceRegion::Forehead, Color::rgb(0xFF, 0x6B, 0x6B)),
            (FaceRegion::LeftEye, Color::rgb(0x4E, 0xCD, 0xC4)),
            (FaceRegion::RightEye, Color::rgb(0x45, 0xB7, 0xD1)),
            (FaceRegion::Chin, Color::rgb(0x96, 0xCE, 0xB4)),
            (FaceRegion::Nose, Color::rgb(0xFF, 0xEA, 0xA7)),
            (FaceRegion::RightEar, Color::rgb(0xDD, 0xA0, 0xDD)),
            (FaceRegion::LeftEar, Color::rgb(0xF3, 0x9C, 0x12)),
        ];
        let solid = |color: Color| RegionStyle {
            stroke: color,
            fill: color,
            fill_opacity: 0.3,
            stroke_width: 2.0,
            stroke_dasharray: None,
            font_size: 26,
            text_color: Color::WHITE,
        };
        Self {
            regions: palette.into_iter().map(|(r, c)| (r, solid(c))).collect(),
            default: solid(Color::rgb(0x95, 0xA5, 0xA6)),
        }
    }

    /// Thin black outlines for every region.
    pub fn minimal() -> Self {
        Self {
            regions: BTreeMap::new(),
            default: RegionStyle {
                stroke: Color::BLACK,
                fill: Color::BLACK,
                fill_opacity: 0.1,
                stroke_width: 1.0,
                stroke_dasharray: None,
                font_size: 20,
                text_color: Color::BLACK,
            },
        }
    }

    /// Loads a style file; fields it omits keep their serde defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn from_preset(preset: StylePreset) -> Self {
        match preset {
            StylePreset::Default => Self::default_theme(),
            StylePreset::Colorful => Self::colorful(),
            StylePreset::Minimal => Self::minimal(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    Default,
    Colorful,
    Minimal,
}

impl StylePreset {
    pub const ALL: &[StylePreset] = &[StylePreset::Default, StylePreset::Colorful, StylePreset::Minimal];
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StylePreset::Default => write!(f, "default"),
            StylePreset::Colorful => write!(f, "colorful"),
            StylePreset::Minimal => write!(f, "minimal"),
        }
    }
}

impl FromStr for StylePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        StylePreset::ALL
            .iter()
            .copied()
            .find(|p| p.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown style '{s}', expected default, colorful or minimal"))
    }
}
