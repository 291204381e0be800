//! Structural invariants of a script document.

use std::path::PathBuf;
use thiserror::Error;

use crate::{ScriptDocument, SCHEMA_VERSION};

/// A document that breaks one of its structural rules.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported document version {found} (expected {SCHEMA_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("Document has no scenes")]
    NoScenes,

    #[error("Unit duration must be positive")]
    ZeroUnit,

    #[error("Scene at position {position} has index {found}, expected {expected}")]
    NonContiguousIndex {
        position: usize,
        expected: u32,
        found: u32,
    },

    #[error("Target duration {target}s is not a positive multiple of the {unit}s unit")]
    TargetNotMultiple { target: u32, unit: u32 },

    #[error("Scene {index} lasts {found}s, expected the {unit}s unit")]
    SceneDuration { index: u32, found: u32, unit: u32 },

    #[error("Scene durations sum to {sum}s but target is {target}s")]
    DurationMismatch { sum: u32, target: u32 },

    #[error("Scene {index} has empty narration")]
    EmptyNarration { index: u32 },

    #[error("Document narration does not match the scene narration slices")]
    NarrationMismatch,

    #[error("{track} volume {value} outside [0, 1]")]
    VolumeOutOfRange { track: &'static str, value: f32 },

    #[error("Scene list changed shape: {0}")]
    SceneStructureChanged(String),

    #[error("Recorded artifact removed: {field} ({path})")]
    ArtifactRemoved { field: String, path: PathBuf },
}

impl ValidationError {
    /// Whether this is a timing rule (durations, unit multiples).
    pub fn is_timing(&self) -> bool {
        matches!(
            self,
            ValidationError::TargetNotMultiple { .. }
                | ValidationError::SceneDuration { .. }
                | ValidationError::DurationMismatch { .. }
                | ValidationError::ZeroUnit
        )
    }
}

impl ScriptDocument {
    /// Check every invariant that holds at any phase boundary.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != SCHEMA_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.version,
            });
        }
        if self.scenes.is_empty() {
            return Err(ValidationError::NoScenes);
        }

        let unit = self.unit_duration_seconds;
        if unit == 0 {
            return Err(ValidationError::ZeroUnit);
        }
        if self.target_duration_seconds == 0 || self.target_duration_seconds % unit != 0 {
            return Err(ValidationError::TargetNotMultiple {
                target: self.target_duration_seconds,
                unit,
            });
        }

        for (position, scene) in self.scenes.iter().enumerate() {
            let expected = position as u32 + 1;
            if scene.index != expected {
                return Err(ValidationError::NonContiguousIndex {
                    position,
                    expected,
                    found: scene.index,
                });
            }
            if scene.duration_seconds != unit {
                return Err(ValidationError::SceneDuration {
                    index: scene.index,
                    found: scene.duration_seconds,
                    unit,
                });
            }
            if scene.narration_text.trim().is_empty() {
                return Err(ValidationError::EmptyNarration { index: scene.index });
            }
        }

        let sum = self.total_scene_seconds();
        if sum != self.target_duration_seconds {
            return Err(ValidationError::DurationMismatch {
                sum,
                target: self.target_duration_seconds,
            });
        }

        if self.narration.text != self.joined_narration() {
            return Err(ValidationError::NarrationMismatch);
        }

        for (track, value) in [
            ("narration", self.audio_config.narration_volume),
            ("music", self.audio_config.music_volume),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::VolumeOutOfRange { track, value });
            }
        }

        Ok(())
    }
}

/// Verify that `after` only adds to `before`: same scenes in the same order,
/// and every recorded artifact path still present.
pub fn ensure_additive(before: &ScriptDocument, after: &ScriptDocument) -> Result<(), ValidationError> {
    if before.scenes.len() != after.scenes.len() {
        return Err(ValidationError::SceneStructureChanged(format!(
            "{} scenes became {}",
            before.scenes.len(),
            after.scenes.len()
        )));
    }

    for (old, new) in before.scenes.iter().zip(&after.scenes) {
        if old.index != new.index || old.visual_type != new.visual_type {
            return Err(ValidationError::SceneStructureChanged(format!(
                "scene {} was replaced",
                old.index
            )));
        }
        check_kept(&old.image_path, &new.image_path, || format!("scenes[{}].imagePath", old.index))?;
        check_kept(&old.video_path, &new.video_path, || format!("scenes[{}].videoPath", old.index))?;
    }

    let (a, b) = (&before.artifacts, &after.artifacts);
    check_kept(&a.narration_audio, &b.narration_audio, || "artifacts.narrationAudio".into())?;
    check_kept(&a.music_audio, &b.music_audio, || "artifacts.musicAudio".into())?;
    check_kept(&a.output_video, &b.output_video, || "artifacts.outputVideo".into())?;
    check_kept(&a.subtitle_track, &b.subtitle_track, || "artifacts.subtitleTrack".into())?;

    Ok(())
}

fn check_kept(
    old: &Option<PathBuf>,
    new: &Option<PathBuf>,
    field: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    match (old, new) {
        (Some(path), None) => Err(ValidationError::ArtifactRemoved {
            field: field(),
            path: path.clone(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_document;

    #[test]
    fn test_sample_document_is_valid() {
        let doc = sample_document(30);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_non_contiguous_indices_rejected() {
        let mut doc = sample_document(30);
        doc.scenes[2].index = 7;
        assert!(matches!(
            doc.validate(),
            Err(ValidationError::NonContiguousIndex { position: 2, expected: 3, found: 7 })
        ));
    }

    #[test]
    fn test_duration_mismatch_is_timing_error() {
        let mut doc = sample_document(30);
        doc.scenes.pop();
        let joined = doc.joined_narration();
        doc.narration.text = joined;
        let err = doc.validate().unwrap_err();
        assert!(matches!(err, ValidationError::DurationMismatch { sum: 25, target: 30 }));
        assert!(err.is_timing());
    }

    #[test]
    fn test_scene_duration_must_equal_unit() {
        let mut doc = sample_document(30);
        doc.scenes[0].duration_seconds = 4;
        doc.scenes[1].duration_seconds = 6;
        let err = doc.validate().unwrap_err();
        assert!(matches!(err, ValidationError::SceneDuration { index: 1, found: 4, unit: 5 }));
    }

    #[test]
    fn test_target_must_be_multiple_of_unit() {
        let mut doc = sample_document(30);
        doc.target_duration_seconds = 32;
        assert!(matches!(
            doc.validate(),
            Err(ValidationError::TargetNotMultiple { target: 32, unit: 5 })
        ));
    }

    #[test]
    fn test_narration_must_match_slices() {
        let mut doc = sample_document(30);
        doc.narration.text.push_str(" extra");
        assert_eq!(doc.validate(), Err(ValidationError::NarrationMismatch));
    }

    #[test]
    fn test_empty_scene_narration_rejected() {
        let mut doc = sample_document(30);
        doc.scenes[3].narration_text = "  ".into();
        doc.narration.text = doc.joined_narration();
        assert_eq!(doc.validate(), Err(ValidationError::EmptyNarration { index: 4 }));
    }

    #[test]
    fn test_volume_range() {
        let mut doc = sample_document(30);
        doc.audio_config.music_volume = 1.5;
        assert!(matches!(
            doc.validate(),
            Err(ValidationError::VolumeOutOfRange { track: "music", .. })
        ));
    }

    #[test]
    fn test_additive_allows_new_paths() {
        let before = sample_document(30);
        let mut after = before.clone();
        after.scenes[0].image_path = Some("images/scene-1.jpg".into());
        after.artifacts.narration_audio = Some("audio/narration.mp3".into());
        assert!(ensure_additive(&before, &after).is_ok());
    }

    #[test]
    fn test_additive_rejects_removal() {
        let mut before = sample_document(30);
        before.scenes[1].image_path = Some("images/scene-2.jpg".into());
        let mut after = before.clone();
        after.scenes[1].image_path = None;
        assert!(matches!(
            ensure_additive(&before, &after),
            Err(ValidationError::ArtifactRemoved { .. })
        ));
    }

    #[test]
    fn test_additive_rejects_reordering() {
        let before = sample_document(30);
        let mut after = before.clone();
        after.scenes.swap(0, 1);
        assert!(matches!(
            ensure_additive(&before, &after),
            Err(ValidationError::SceneStructureChanged(_))
        ));
    }
}
