//! Composition planning: everything decided before FFmpeg runs.

use std::path::{Path, PathBuf};

use shortgen_models::{EncodingConfig, ScriptDocument, VisualType};

use crate::error::{MediaError, MediaResult, MissingArtifact};
use crate::fs_utils::is_nonempty_file;
use crate::filters::{frame_count, AudioTrack, KenBurnsDirection};
use crate::subtitles::{cues_from_document, SubtitleCue};

use super::{CompositionOptions, SubtitleMode};

/// How a scene's clip is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipSource {
    /// Animate a still with a camera move.
    Still {
        image: PathBuf,
        direction: KenBurnsDirection,
    },
    /// Fit a generated motion clip, trimming or holding its last frame.
    Motion { video: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlan {
    pub index: u32,
    pub source: ClipSource,
    /// Offset of the clip in the final timeline.
    pub start: f64,
    pub duration: f64,
    pub frames: u32,
}

/// Input file and gain for one audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInput {
    pub path: PathBuf,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub clips: Vec<ClipPlan>,
    pub total_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub narration: Option<AudioInput>,
    pub music: Option<AudioInput>,
    /// Empty when subtitles are off.
    pub cues: Vec<SubtitleCue>,
}

impl CompositionPlan {
    /// Audio tracks with the FFmpeg input indices they get after the video
    /// (input 0).
    pub fn audio_tracks(&self) -> (Option<AudioTrack>, Option<AudioTrack>) {
        let mut next = 1;
        let mut track = |input: &Option<AudioInput>| {
            input.as_ref().map(|a| {
                let t = AudioTrack {
                    input: next,
                    volume: a.volume,
                };
                next += 1;
                t
            })
        };
        let narration = track(&self.narration);
        let music = track(&self.music);
        (narration, music)
    }
}

async fn require(missing: &mut Vec<MissingArtifact>, field: String, path: Option<&Path>) {
    match path {
        Some(p) if is_nonempty_file(p).await => {}
        Some(p) => missing.push(MissingArtifact {
            field,
            path: Some(p.to_path_buf()),
        }),
        None => missing.push(MissingArtifact { field, path: None }),
    }
}

/// Refuse composition unless the document is valid and every artifact the
/// options call for exists on disk and is non-empty.
pub async fn check_preconditions(doc: &ScriptDocument, options: &CompositionOptions) -> MediaResult<()> {
    doc.validate().map_err(|e| {
        if e.is_timing() {
            MediaError::timing(e.to_string())
        } else {
            MediaError::InvalidDocument(e)
        }
    })?;

    let mut missing = Vec::new();
    for scene in &doc.scenes {
        let field = match scene.visual_type {
            VisualType::WebImage | VisualType::GeneratedImage => {
                format!("scenes[{}].imagePath", scene.index)
            }
            VisualType::GeneratedVideo => format!("scenes[{}].videoPath", scene.index),
        };
        require(&mut missing, field, scene.primary_visual()).await;
    }
    if options.include_narration {
        require(
            &mut missing,
            "artifacts.narrationAudio".to_string(),
            doc.artifacts.narration_audio.as_deref(),
        )
        .await;
    }
    if options.include_music {
        require(
            &mut missing,
            "artifacts.musicAudio".to_string(),
            doc.artifacts.music_audio.as_deref(),
        )
        .await;
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MediaError::PreconditionFailed(missing))
    }
}

/// Build the clip timeline and audio plan for a ready document.
pub async fn plan_composition(
    doc: &ScriptDocument,
    options: &CompositionOptions,
    encoding: &EncodingConfig,
) -> MediaResult<CompositionPlan> {
    check_preconditions(doc, options).await?;

    let (width, height) = doc.orientation.dimensions();
    let fps = encoding.fps;

    let mut clips = Vec::with_capacity(doc.scenes.len());
    let mut offset = 0.0;
    for (position, scene) in doc.scenes.iter().enumerate() {
        let duration = scene.duration_seconds as f64;
        let path = scene
            .primary_visual()
            .ok_or_else(|| MediaError::internal(format!("scene {} lost its visual", scene.index)))?
            .to_path_buf();
        let source = match scene.visual_type {
            VisualType::WebImage | VisualType::GeneratedImage => ClipSource::Still {
                image: path,
                direction: KenBurnsDirection::for_position(position),
            },
            VisualType::GeneratedVideo => ClipSource::Motion { video: path },
        };

        let frames = frame_count(duration, fps);
        if (frames as f64 / fps as f64 - duration).abs() > 1e-9 {
            return Err(MediaError::timing(format!(
                "scene {} lasts {duration}s which is not a whole number of frames at {fps} fps",
                scene.index
            )));
        }

        clips.push(ClipPlan {
            index: scene.index,
            source,
            start: offset,
            duration,
            frames,
        });
        offset += duration;
    }

    let total_seconds = doc.target_duration_seconds as f64;
    if (offset - total_seconds).abs() > 1e-9 {
        return Err(MediaError::timing(format!(
            "clips span {offset}s but the target is {total_seconds}s"
        )));
    }

    let narration = if options.include_narration {
        doc.artifacts.narration_audio.clone().map(|path| AudioInput {
            path,
            volume: doc.audio_config.narration_volume,
        })
    } else {
        None
    };
    let music = if options.include_music {
        doc.artifacts.music_audio.clone().map(|path| AudioInput {
            path,
            volume: doc.audio_config.music_volume,
        })
    } else {
        None
    };

    let cues = match options.subtitles {
        SubtitleMode::Off => Vec::new(),
        SubtitleMode::Burn | SubtitleMode::Embed => cues_from_document(doc),
    };

    Ok(CompositionPlan {
        clips,
        total_seconds,
        width,
        height,
        fps,
        narration,
        music,
        cues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document_with_mode;
    use shortgen_models::{ScriptDocument, VisualMode};
    use tempfile::TempDir;

    /// Write every artifact the document needs and record the paths.
    fn populate(doc: &mut ScriptDocument, dir: &Path) {
        for scene in &mut doc.scenes {
            let image = dir.join(format!("scene-{}.jpg", scene.index));
            std::fs::write(&image, b"jpg").unwrap();
            scene.image_path = Some(image);
            if scene.visual_type == VisualType::GeneratedVideo {
                let video = dir.join(format!("scene-{}.mp4", scene.index));
                std::fs::write(&video, b"mp4").unwrap();
                scene.video_path = Some(video);
            }
        }
        let narration = dir.join("narration.mp3");
        let music = dir.join("music.mp3");
        std::fs::write(&narration, b"mp3").unwrap();
        std::fs::write(&music, b"mp3").unwrap();
        doc.artifacts.narration_audio = Some(narration);
        doc.artifacts.music_audio = Some(music);
    }

    #[tokio::test]
    async fn test_plan_for_mixed_document() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(30, VisualMode::Mixed);
        populate(&mut doc, dir.path());

        let plan = plan_composition(&doc, &CompositionOptions::default(), &EncodingConfig::default()).await.unwrap();

        assert_eq!(plan.clips.len(), 6);
        assert!(matches!(plan.clips[0].source, ClipSource::Motion { .. }));
        assert!(matches!(plan.clips[5].source, ClipSource::Motion { .. }));
        assert!(matches!(plan.clips[2].source, ClipSource::Still { .. }));
        assert_eq!(plan.clips[3].start, 15.0);
        assert!(plan.clips.iter().all(|c| c.frames == 125));
        assert_eq!(plan.total_seconds, 30.0);
        assert_eq!(plan.narration.as_ref().unwrap().volume, 1.0);
        assert_eq!(plan.music.as_ref().unwrap().volume, 0.15);

        let (narration, music) = plan.audio_tracks();
        assert_eq!(narration.unwrap().input, 1);
        assert_eq!(music.unwrap().input, 2);
    }

    #[tokio::test]
    async fn test_adjacent_stills_get_different_moves() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(20, VisualMode::AiImages);
        populate(&mut doc, dir.path());

        let plan = plan_composition(&doc, &CompositionOptions::default(), &EncodingConfig::default()).await.unwrap();
        let directions: Vec<_> = plan
            .clips
            .iter()
            .map(|c| match &c.source {
                ClipSource::Still { direction, .. } => *direction,
                ClipSource::Motion { .. } => panic!("expected still"),
            })
            .collect();
        assert!(directions.windows(2).all(|w| w[0] != w[1]));
    }

    #[tokio::test]
    async fn test_missing_video_refuses_composition() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(30, VisualMode::Mixed);
        populate(&mut doc, dir.path());
        doc.scenes[5].video_path = None;

        let err = check_preconditions(&doc, &CompositionOptions::default()).await.unwrap_err();
        match err {
            MediaError::PreconditionFailed(missing) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].field, "scenes[6].videoPath");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_file_counts_as_missing() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(10, VisualMode::WebImages);
        populate(&mut doc, dir.path());
        std::fs::write(doc.artifacts.narration_audio.as_ref().unwrap(), b"").unwrap();

        let err = check_preconditions(&doc, &CompositionOptions::default()).await.unwrap_err();
        assert!(matches!(err, MediaError::PreconditionFailed(ref m) if m[0].path.is_some()));
    }

    #[tokio::test]
    async fn test_disabled_music_is_not_required() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(10, VisualMode::WebImages);
        populate(&mut doc, dir.path());
        doc.artifacts.music_audio = None;

        let options = CompositionOptions {
            include_music: false,
            ..Default::default()
        };
        let plan = plan_composition(&doc, &options, &EncodingConfig::default()).await.unwrap();
        assert!(plan.music.is_none());
        assert_eq!(plan.audio_tracks().0.unwrap().input, 1);
    }

    #[tokio::test]
    async fn test_timing_violation_is_reported_as_such() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(10, VisualMode::WebImages);
        populate(&mut doc, dir.path());
        doc.target_duration_seconds = 15;

        let err = check_preconditions(&doc, &CompositionOptions::default()).await.unwrap_err();
        assert!(matches!(err, MediaError::TimingViolation(_)));
    }

    #[tokio::test]
    async fn test_subtitle_cues_only_when_enabled() {
        let dir = TempDir::new().unwrap();
        let mut doc = sample_document_with_mode(10, VisualMode::WebImages);
        populate(&mut doc, dir.path());

        let off = plan_composition(&doc, &CompositionOptions::default(), &EncodingConfig::default()).await.unwrap();
        assert!(off.cues.is_empty());

        let options = CompositionOptions {
            subtitles: SubtitleMode::Burn,
            ..Default::default()
        };
        let on = plan_composition(&doc, &options, &EncodingConfig::default()).await.unwrap();
        assert_eq!(on.cues.len(), 2);
    }
}
