//! Artifact slots and the on-disk layout of a run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::ScriptDocument;

/// The kind of asset a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    WebImage,
    GeneratedImage,
    GeneratedVideo,
    Narration,
    Music,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::WebImage => "image_search",
            AssetKind::GeneratedImage => "image_generation",
            AssetKind::GeneratedVideo => "video_generation",
            AssetKind::Narration => "narration",
            AssetKind::Music => "music",
        }
    }

    /// The slot an item of this kind fills.
    pub fn slot_for(&self, item: WorkItem) -> Option<ArtifactSlot> {
        match (self, item) {
            (AssetKind::WebImage | AssetKind::GeneratedImage, WorkItem::Scene(index)) => {
                Some(ArtifactSlot::SceneImage(index))
            }
            (AssetKind::GeneratedVideo, WorkItem::Scene(index)) => Some(ArtifactSlot::SceneVideo(index)),
            (AssetKind::Narration, WorkItem::Document) => Some(ArtifactSlot::NarrationAudio),
            (AssetKind::Music, WorkItem::Document) => Some(ArtifactSlot::MusicAudio),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of provider work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItem {
    Scene(u32),
    Document,
}

impl WorkItem {
    pub fn scene_index(&self) -> Option<u32> {
        match self {
            WorkItem::Scene(index) => Some(*index),
            WorkItem::Document => None,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Scene(index) => write!(f, "scene {index}"),
            WorkItem::Document => f.write_str("document"),
        }
    }
}

/// A path-valued field of the document that a provider may fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactSlot {
    SceneImage(u32),
    SceneVideo(u32),
    NarrationAudio,
    MusicAudio,
}

impl ArtifactSlot {
    /// Currently recorded path, if any.
    pub fn get<'a>(&self, doc: &'a ScriptDocument) -> Option<&'a Path> {
        match *self {
            ArtifactSlot::SceneImage(index) => doc.scene(index)?.image_path.as_deref(),
            ArtifactSlot::SceneVideo(index) => doc.scene(index)?.video_path.as_deref(),
            ArtifactSlot::NarrationAudio => doc.artifacts.narration_audio.as_deref(),
            ArtifactSlot::MusicAudio => doc.artifacts.music_audio.as_deref(),
        }
    }

    /// Record `path`. Returns false when the slot's scene does not exist.
    pub fn set(&self, doc: &mut ScriptDocument, path: PathBuf) -> bool {
        let field = match *self {
            ArtifactSlot::SceneImage(index) => match doc.scene_mut(index) {
                Some(scene) => &mut scene.image_path,
                None => return false,
            },
            ArtifactSlot::SceneVideo(index) => match doc.scene_mut(index) {
                Some(scene) => &mut scene.video_path,
                None => return false,
            },
            ArtifactSlot::NarrationAudio => &mut doc.artifacts.narration_audio,
            ArtifactSlot::MusicAudio => &mut doc.artifacts.music_audio,
        };
        *field = Some(path);
        true
    }
}

impl fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSlot::SceneImage(index) => write!(f, "scenes[{index}].imagePath"),
            ArtifactSlot::SceneVideo(index) => write!(f, "scenes[{index}].videoPath"),
            ArtifactSlot::NarrationAudio => f.write_str("artifacts.narrationAudio"),
            ArtifactSlot::MusicAudio => f.write_str("artifacts.musicAudio"),
        }
    }
}

/// Directory tree holding every artifact of one run.
///
/// ```text
/// <root>/images/scene-N.jpg
/// <root>/videos/scene-N.mp4
/// <root>/audio/narration.mp3
/// <root>/audio/music.mp3
/// <root>/video/<slug>.mp4
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at `output/` next to the script file.
    pub fn beside_script(script_path: &Path) -> Self {
        let parent = script_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(parent.join("output"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join("video")
    }

    /// Every directory a run writes into.
    pub fn directories(&self) -> [PathBuf; 4] {
        [self.images_dir(), self.videos_dir(), self.audio_dir(), self.video_dir()]
    }

    /// Deterministic output path for a slot.
    pub fn path_for(&self, slot: ArtifactSlot) -> PathBuf {
        match slot {
            ArtifactSlot::SceneImage(index) => self.images_dir().join(format!("scene-{index}.jpg")),
            ArtifactSlot::SceneVideo(index) => self.videos_dir().join(format!("scene-{index}.mp4")),
            ArtifactSlot::NarrationAudio => self.audio_dir().join("narration.mp3"),
            ArtifactSlot::MusicAudio => self.audio_dir().join("music.mp3"),
        }
    }

    pub fn output_video(&self, slug: &str) -> PathBuf {
        self.video_dir().join(format!("{slug}.mp4"))
    }

    /// Subtitle file path; `extension` is `ass` or `srt`.
    pub fn subtitle_path(&self, extension: &str) -> PathBuf {
        self.video_dir().join(format!("subtitles.{extension}"))
    }
}
