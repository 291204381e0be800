//! Pipeline phase tags.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last phase a document completed.
///
/// The tag is an audit trail. Whether work is still needed is decided from
/// artifact presence on disk, so a restarted run re-walks every phase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    #[default]
    Scheduled,
    ImagesAcquired,
    VideosGenerated,
    NarrationGenerated,
    MusicGenerated,
    Composed,
}

impl PipelinePhase {
    /// Phases in execution order.
    pub const ORDER: &'static [PipelinePhase] = &[
        PipelinePhase::Scheduled,
        PipelinePhase::ImagesAcquired,
        PipelinePhase::VideosGenerated,
        PipelinePhase::NarrationGenerated,
        PipelinePhase::MusicGenerated,
        PipelinePhase::Composed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Scheduled => "scheduled",
            PipelinePhase::ImagesAcquired => "images_acquired",
            PipelinePhase::VideosGenerated => "videos_generated",
            PipelinePhase::NarrationGenerated => "narration_generated",
            PipelinePhase::MusicGenerated => "music_generated",
            PipelinePhase::Composed => "composed",
        }
    }

    /// Whether nothing is left to run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Composed)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
