//! The script document: the single state record every pipeline phase extends.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Orientation, PipelinePhase, Style, VisualMode, VisualType};

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;
/// Default scene length in seconds.
pub const DEFAULT_UNIT_SECONDS: u32 = 5;
/// Default narration gain.
pub const DEFAULT_NARRATION_VOLUME: f32 = 1.0;
/// Default music gain, low enough to sit under speech.
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.15;
/// Average speaking rate used for word budgets.
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Full state of one short, persisted as `script.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDocument {
    pub version: u32,
    #[serde(default)]
    pub phase: PipelinePhase,
    pub title: String,
    /// Caption line with hashtags.
    #[serde(default)]
    pub description: String,
    pub style: Style,
    pub visual_mode: VisualMode,
    pub voice: String,
    #[serde(default)]
    pub orientation: Orientation,
    /// Whether the compositor renders subtitles unless told otherwise.
    #[serde(default)]
    pub subtitles: bool,
    pub target_duration_seconds: u32,
    #[serde(default = "default_unit_seconds")]
    pub unit_duration_seconds: u32,
    pub narration: Narration,
    pub audio_config: AudioConfig,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub artifacts: Artifacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

fn default_unit_seconds() -> u32 {
    DEFAULT_UNIT_SECONDS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Narration {
    /// Scene narrations joined by single spaces, in scene order.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub music_prompt: String,
    #[serde(default = "default_narration_volume")]
    pub narration_volume: f32,
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,
}

fn default_narration_volume() -> f32 {
    DEFAULT_NARRATION_VOLUME
}
fn default_music_volume() -> f32 {
    DEFAULT_MUSIC_VOLUME
}

impl AudioConfig {
    pub fn for_style(style: Style) -> Self {
        Self {
            music_prompt: style.music_prompt().to_string(),
            narration_volume: DEFAULT_NARRATION_VOLUME,
            music_volume: DEFAULT_MUSIC_VOLUME,
        }
    }
}

/// One fixed-length slice of the short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// 1-based position; join key for per-scene artifacts.
    pub index: u32,
    #[serde(default)]
    pub title: String,
    pub narration_text: String,
    pub duration_seconds: u32,
    pub visual_type: VisualType,
    pub visual: VisualDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
}

impl Scene {
    /// Start offset of this scene inside the short, in seconds.
    pub fn start_seconds(&self) -> u32 {
        self.index.saturating_sub(1) * self.duration_seconds
    }

    /// The file the compositor reads for this scene.
    pub fn primary_visual(&self) -> Option<&Path> {
        match self.visual_type {
            VisualType::WebImage | VisualType::GeneratedImage => self.image_path.as_deref(),
            VisualType::GeneratedVideo => self.video_path.as_deref(),
        }
    }
}

/// Prompts for every way a scene's visual can be sourced.
///
/// All three are kept so a scene can be re-typed without re-deriving prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct VisualDescriptor {
    pub search_query: String,
    pub image_prompt: String,
    pub motion_prompt: String,
}

/// Document-level outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration_audio: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_audio: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_video: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_track: Option<PathBuf>,
}

impl ScriptDocument {
    pub fn scene(&self, index: u32) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.index == index)
    }

    pub fn scene_mut(&mut self, index: u32) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.index == index)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Sum of all scene durations.
    pub fn total_scene_seconds(&self) -> u32 {
        self.scenes.iter().map(|s| s.duration_seconds).sum()
    }

    /// Narration rebuilt from the scene slices.
    pub fn joined_narration(&self) -> String {
        join_narration(self.scenes.iter().map(|s| s.narration_text.as_str()))
    }

    /// File-name friendly version of the title.
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

/// Join narration slices with single spaces.
pub fn join_narration<'a>(slices: impl IntoIterator<Item = &'a str>) -> String {
    slices
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, hyphen-separated, at most 60 characters.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    if slug.len() > 60 {
        slug.truncate(60);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        "short".to_string()
    } else {
        slug
    }
}
