//! Output shape and motion vocabulary.

use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target aspect ratio (e.g. 9:16 for vertical shorts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Vertical video (9:16)
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Horizontal video (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AspectRatioParseError::InvalidFormat(s.to_string()))?;

        let width = w
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(w.to_string()))?;
        let height = h
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(h.to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = AspectRatioParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl JsonSchema for AspectRatio {
    fn schema_name() -> String {
        "AspectRatio".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),

    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),

    #[error("Aspect ratio values must be non-zero")]
    ZeroValue,
}

/// Requested clip length bucket. Vendors only accept a few fixed lengths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    #[default]
    Short,
    Long,
}

impl DurationCategory {
    pub fn seconds(&self) -> u32 {
        match self {
            DurationCategory::Short => 5,
            DurationCategory::Long => 10,
        }
    }
}

/// Camera motion tag for a scene.
///
/// Doubles as the key into the motion rules table and as the CSS animation
/// the UI plays when no generated clip exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    #[default]
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    Static,
}

impl MotionType {
    pub const ALL: [MotionType; 5] = [
        MotionType::ZoomIn,
        MotionType::ZoomOut,
        MotionType::PanLeft,
        MotionType::PanRight,
        MotionType::Static,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionType::ZoomIn => "zoom_in",
            MotionType::ZoomOut => "zoom_out",
            MotionType::PanLeft => "pan_left",
            MotionType::PanRight => "pan_right",
            MotionType::Static => "static",
        }
    }
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::LANDSCAPE);
        assert_eq!(
            "0:9".parse::<AspectRatio>(),
            Err(AspectRatioParseError::ZeroValue)
        );
        assert!(matches!(
            "wide".parse::<AspectRatio>(),
            Err(AspectRatioParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_aspect_ratio_serde() {
        let json = serde_json::to_string(&AspectRatio::PORTRAIT).unwrap();
        assert_eq!(json, "\"9:16\"");
    }

    #[test]
    fn test_duration_seconds() {
        assert_eq!(DurationCategory::Short.seconds(), 5);
        assert_eq!(DurationCategory::Long.seconds(), 10);
    }

    #[test]
    fn test_motion_type_serde_matches_as_str() {
        for motion in MotionType::ALL {
            let json = serde_json::to_string(&motion).unwrap();
            assert_eq!(json, format!("\"{}\"", motion.as_str()));
        }
    }
}
