//! Compression presets and output formats.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Audio codec used for every video preset
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate used for every video preset
pub const AUDIO_BITRATE: &str = "128k";

/// Named compression preset.
///
/// Each preset carries a video encoding profile and an image profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// H.264, capped bitrate, 2048px images
    #[default]
    Facebook,
    /// H.264, higher bitrate cap, 1440px images
    Instagram,
    /// H.265 at low CRF, full resolution images
    HighQuality,
    /// H.265 middle ground
    Balanced,
    /// H.265 at high CRF, small images
    Aggressive,
}

/// Video encoding profile of a preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPreset {
    /// Video codec (e.g., "libx264", "libx265")
    pub codec: &'static str,
    /// Constant Rate Factor
    pub crf: u8,
    /// Encoder speed preset
    pub preset: &'static str,
    /// Additional output arguments
    pub extra_args: &'static [&'static str],
}

/// Image encoding profile of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreset {
    /// Encoder quality (1-100)
    pub quality: u8,
    /// Longest side limit; `None` keeps full resolution
    pub max_dimension: Option<u32>,
}

const HEVC_EXTRA: &[&str] = &["-tag:v", "hvc1", "-movflags", "+faststart"];

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Facebook,
        Preset::Instagram,
        Preset::HighQuality,
        Preset::Balanced,
        Preset::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Facebook => "facebook",
            Preset::Instagram => "instagram",
            Preset::HighQuality => "high_quality",
            Preset::Balanced => "balanced",
            Preset::Aggressive => "aggressive",
        }
    }

    /// Video encoding profile.
    pub fn video(&self) -> VideoPreset {
        match self {
            Preset::Facebook => VideoPreset {
                codec: "libx264",
                crf: 23,
                preset: "medium",
                extra_args: &[
                    "-maxrate",
                    "1638k",
                    "-bufsize",
                    "3276k",
                    "-movflags",
                    "+faststart",
                ],
            },
            Preset::Instagram => VideoPreset {
                codec: "libx264",
                crf: 23,
                preset: "medium",
                extra_args: &[
                    "-maxrate",
                    "3500k",
                    "-bufsize",
                    "7000k",
                    "-movflags",
                    "+faststart",
                ],
            },
            Preset::HighQuality => VideoPreset {
                codec: "libx265",
                crf: 22,
                preset: "slow",
                extra_args: HEVC_EXTRA,
            },
            Preset::Balanced => VideoPreset {
                codec: "libx265",
                crf: 26,
                preset: "medium",
                extra_args: HEVC_EXTRA,
            },
            Preset::Aggressive => VideoPreset {
                codec: "libx265",
                crf: 30,
                preset: "fast",
                extra_args: HEVC_EXTRA,
            },
        }
    }

    /// Image encoding profile.
    pub fn image(&self) -> ImagePreset {
        let (quality, max_dimension) = match self {
            Preset::Facebook => (80, Some(2048)),
            Preset::Instagram => (80, Some(1440)),
            Preset::HighQuality => (88, None),
            Preset::Balanced => (75, Some(2400)),
            Preset::Aggressive => (65, Some(1920)),
        };
        ImagePreset {
            quality,
            max_dimension,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| ModelError::UnknownPreset(s.to_string()))
    }
}

/// Output format for still images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }

    /// File extension of the encoded output.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            _ => Err(ModelError::UnknownImageFormat(s.to_string())),
        }
    }
}
