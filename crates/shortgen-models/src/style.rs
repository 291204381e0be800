//! Content style, visual mode and visual type definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Narrative tone of a short. Drives the default voice and music prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Educational,
    Promotional,
    Storytelling,
    Hype,
}

impl Style {
    pub const ALL: &'static [Style] = &[
        Style::Educational,
        Style::Promotional,
        Style::Storytelling,
        Style::Hype,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Educational => "educational",
            Style::Promotional => "promotional",
            Style::Storytelling => "storytelling",
            Style::Hype => "hype",
        }
    }

    /// Default text-to-speech voice for this style.
    pub fn default_voice(&self) -> &'static str {
        match self {
            Style::Educational => "aura-2-asteria-en",
            Style::Promotional => "aura-2-athena-en",
            Style::Storytelling => "aura-2-perseus-en",
            Style::Hype => "aura-2-arcas-en",
        }
    }

    /// Default background music prompt for this style.
    pub fn music_prompt(&self) -> &'static str {
        match self {
            Style::Educational => {
                "Calm ambient electronic background music, minimal beats, informative and clean feel, soft synth pads"
            }
            Style::Promotional => {
                "Upbeat modern pop instrumental, confident energy, rising build, catchy rhythm, corporate but cool"
            }
            Style::Storytelling => {
                "Gentle acoustic guitar with soft piano, emotional and warm, cinematic undertones, intimate mood"
            }
            Style::Hype => {
                "Hard-hitting trap beat, bass-heavy, intense energy, trending sound, fast tempo, bold drops"
            }
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "educational" => Ok(Style::Educational),
            "promotional" => Ok(Style::Promotional),
            "storytelling" => Ok(Style::Storytelling),
            "hype" => Ok(Style::Hype),
            _ => Err(EnumParseError::new("style", s)),
        }
    }
}

/// How scene visuals are sourced for a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VisualMode {
    /// Stock photos from image search for every scene.
    #[default]
    WebImages,
    /// Generated stills for every scene.
    AiImages,
    /// Generated motion clips for every scene.
    AiVideo,
    /// Motion clips bracket the short, stock photos fill the middle.
    Mixed,
}

impl VisualMode {
    pub const ALL: &'static [VisualMode] = &[
        VisualMode::WebImages,
        VisualMode::AiImages,
        VisualMode::AiVideo,
        VisualMode::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualMode::WebImages => "web-images",
            VisualMode::AiImages => "ai-images",
            VisualMode::AiVideo => "ai-video",
            VisualMode::Mixed => "mixed",
        }
    }

    /// Visual type for the scene at `position` (0-based) out of `scene_count`.
    pub fn visual_type_for(&self, position: usize, scene_count: usize) -> VisualType {
        match self {
            VisualMode::WebImages => VisualType::WebImage,
            VisualMode::AiImages => VisualType::GeneratedImage,
            VisualMode::AiVideo => VisualType::GeneratedVideo,
            VisualMode::Mixed => {
                if position == 0 || position + 1 == scene_count {
                    VisualType::GeneratedVideo
                } else {
                    VisualType::WebImage
                }
            }
        }
    }
}

impl fmt::Display for VisualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualMode {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web-images" | "web" => Ok(VisualMode::WebImages),
            "ai-images" => Ok(VisualMode::AiImages),
            "ai-video" => Ok(VisualMode::AiVideo),
            "mixed" => Ok(VisualMode::Mixed),
            _ => Err(EnumParseError::new("visual mode", s)),
        }
    }
}

/// Where a single scene's visual comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum VisualType {
    WebImage,
    GeneratedImage,
    /// Needs a generated still first, then an image-to-video call.
    GeneratedVideo,
}

impl VisualType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualType::WebImage => "web-image",
            VisualType::GeneratedImage => "generated-image",
            VisualType::GeneratedVideo => "generated-video",
        }
    }

    /// Whether the compositor animates a still for this scene.
    pub fn is_still(&self) -> bool {
        !matches!(self, VisualType::GeneratedVideo)
    }
}

impl fmt::Display for VisualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web-image" => Ok(VisualType::WebImage),
            "generated-image" => Ok(VisualType::GeneratedImage),
            "generated-video" => Ok(VisualType::GeneratedVideo),
            _ => Err(EnumParseError::new("visual type", s)),
        }
    }
}

/// Output frame orientation. Only 9:16 portrait is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
}

impl Orientation {
    /// Frame size in pixels (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Orientation::Portrait => (1080, 1920),
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Orientation::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct EnumParseError {
    kind: &'static str,
    value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
