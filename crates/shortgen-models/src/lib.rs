//! Shared data models for the shortgen pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - The script document and its scenes
//! - Styles, visual modes and visual types
//! - Pipeline phase tags and structural validation
//! - Artifact slots and the run directory layout
//! - Encoding configuration and cost estimates

pub mod artifact;
pub mod cost;
pub mod document;
pub mod encoding;
pub mod phase;
pub mod run;
pub mod style;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export common types
pub use artifact::{ArtifactSlot, AssetKind, RunLayout, WorkItem};
pub use cost::{estimate_cost, CostEstimate};
pub use document::{
    join_narration, slugify, Artifacts, AudioConfig, Narration, Scene, ScriptDocument,
    VisualDescriptor, DEFAULT_MUSIC_VOLUME, DEFAULT_NARRATION_VOLUME, DEFAULT_UNIT_SECONDS,
    SCHEMA_VERSION, WORDS_PER_SECOND,
};
pub use encoding::EncodingConfig;
pub use phase::PipelinePhase;
pub use run::RunId;
pub use style::{EnumParseError, Orientation, Style, VisualMode, VisualType};
pub use validation::{ensure_additive, ValidationError};
