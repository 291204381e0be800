//! The compositor: turns a fully populated script document into one video.
//!
//! Composition runs in three steps:
//! 1. one silent clip per scene, forced to the scene's exact duration
//! 2. a stream-copy concat of those clips in index order
//! 3. a final pass muxing the narration/music mix and optional subtitles
//!
//! Intermediate files live in a scratch directory under the run root and the
//! output is published by rename, so a failed run never leaves a partial
//! video at the output path.

pub mod plan;
pub mod render;

use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use shortgen_models::{EncodingConfig, RunLayout, ScriptDocument};

use crate::command::FfmpegRunner;
use crate::concat::concat_files;
use crate::error::MediaResult;
use crate::fs_utils::{move_file, write_atomic};
use crate::probe::get_duration;
use crate::subtitles::{self, SubtitleFormat};

pub use plan::{check_preconditions, plan_composition, ClipPlan, ClipSource, CompositionPlan};

/// Default allowed drift between target and measured output: one frame at 25 fps.
pub const DEFAULT_DURATION_TOLERANCE_SECS: f64 = 0.04;

/// How subtitles end up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleMode {
    #[default]
    Off,
    /// Rendered into the pixels with the ASS track.
    Burn,
    /// Carried as a soft `mov_text` track built from the SRT file.
    Embed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionOptions {
    pub subtitles: SubtitleMode,
    pub include_narration: bool,
    pub include_music: bool,
    /// Seconds of drift tolerated before a warning is logged.
    pub duration_tolerance: f64,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            subtitles: SubtitleMode::Off,
            include_narration: true,
            include_music: true,
            duration_tolerance: DEFAULT_DURATION_TOLERANCE_SECS,
        }
    }
}

/// What composition produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionOutcome {
    pub output: PathBuf,
    pub actual_duration: f64,
    pub subtitle_track: Option<PathBuf>,
    /// Non-fatal findings, such as a duration outside tolerance.
    pub warnings: Vec<String>,
}

impl CompositionOutcome {
    /// Record the outputs on the document.
    pub fn apply_to(&self, doc: &mut ScriptDocument) {
        doc.artifacts.output_video = Some(self.output.clone());
        doc.artifacts.actual_duration_seconds = Some(self.actual_duration);
        if let Some(track) = &self.subtitle_track {
            doc.artifacts.subtitle_track = Some(track.clone());
        }
    }
}

/// FFmpeg-backed compositor.
#[derive(Debug, Clone)]
pub struct Compositor {
    layout: RunLayout,
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl Compositor {
    pub fn new(layout: RunLayout, encoding: EncodingConfig) -> Self {
        Self {
            layout,
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    /// Use a runner carrying cancellation and timeout settings.
    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Compose the final video for `doc`.
    ///
    /// Fails with a precondition error before touching FFmpeg when any
    /// required artifact is missing.
    pub async fn compose(
        &self,
        doc: &ScriptDocument,
        options: &CompositionOptions,
    ) -> MediaResult<CompositionOutcome> {
        let plan = plan_composition(doc, options, &self.encoding).await?;
        let started = Instant::now();

        info!(
            "Composing {} clips ({}s) for '{}'",
            plan.clips.len(),
            plan.total_seconds,
            doc.title
        );

        tokio::fs::create_dir_all(self.layout.video_dir()).await?;
        let scratch = tempfile::Builder::new()
            .prefix(".compose-")
            .tempdir_in(self.layout.root())?;

        let mut clip_paths = Vec::with_capacity(plan.clips.len());
        for clip in &plan.clips {
            let clip_path = scratch.path().join(format!("clip-{:03}.mp4", clip.index));
            let cmd = render::clip_command(clip, &plan, &self.encoding, &clip_path);
            self.runner.run(&cmd).await?;
            debug!(scene_index = clip.index, "Rendered clip {}", clip_path.display());
            clip_paths.push(clip_path);
        }

        let joined = scratch.path().join("joined.mp4");
        concat_files(&self.runner, &clip_paths, &scratch.path().join("clips.txt"), &joined).await?;

        let subtitle_track = self.write_subtitles(&plan, options.subtitles).await?;

        let staged = scratch.path().join("final.mp4");
        let cmd = render::final_command(
            &plan,
            &self.encoding,
            &joined,
            options.subtitles,
            subtitle_track.as_deref(),
            &staged,
        );
        let total = plan.total_seconds;
        self.runner
            .run_with_progress(&cmd, move |p| {
                debug!("Final mux {:.0}% ({:.1}x)", p.percentage(total), p.speed);
            })
            .await?;

        let output = self.layout.output_video(&doc.slug());
        move_file(&staged, &output).await?;

        let actual_duration = get_duration(&output).await?;
        let mut warnings = Vec::new();
        let drift = (actual_duration - plan.total_seconds).abs();
        if drift > options.duration_tolerance {
            let message = format!(
                "Output lasts {actual_duration:.3}s, target {:.3}s (drift {drift:.3}s)",
                plan.total_seconds
            );
            warn!("{}", message);
            warnings.push(message);
        }

        info!(
            "Composed {} in {:.1}s ({:.3}s long)",
            output.display(),
            started.elapsed().as_secs_f64(),
            actual_duration
        );

        Ok(CompositionOutcome {
            output,
            actual_duration,
            subtitle_track,
            warnings,
        })
    }

    /// Write both subtitle formats and return the one the mode uses.
    async fn write_subtitles(
        &self,
        plan: &CompositionPlan,
        mode: SubtitleMode,
    ) -> MediaResult<Option<PathBuf>> {
        let used = match mode {
            SubtitleMode::Off => return Ok(None),
            SubtitleMode::Burn => SubtitleFormat::Ass,
            SubtitleMode::Embed => SubtitleFormat::Srt,
        };

        let mut used_path = None;
        for format in [SubtitleFormat::Ass, SubtitleFormat::Srt] {
            let path = self.layout.subtitle_path(format.extension());
            let body = subtitles::render(format, &plan.cues, plan.width, plan.height);
            write_atomic(&path, body.as_bytes()).await?;
            if format == used {
                used_path = Some(path);
            }
        }
        Ok(used_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document;

    #[test]
    fn test_outcome_applies_to_document() {
        let mut doc = sample_document(10);
        let outcome = CompositionOutcome {
            output: PathBuf::from("video/sample-short.mp4"),
            actual_duration: 10.02,
            subtitle_track: Some(PathBuf::from("video/subtitles.ass")),
            warnings: Vec::new(),
        };
        outcome.apply_to(&mut doc);
        assert_eq!(doc.artifacts.output_video, Some(PathBuf::from("video/sample-short.mp4")));
        assert_eq!(doc.artifacts.actual_duration_seconds, Some(10.02));
        assert!(doc.artifacts.subtitle_track.is_some());
    }

    #[tokio::test]
    async fn test_compose_refuses_incomplete_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let compositor = Compositor::new(RunLayout::new(dir.path()), EncodingConfig::default());
        let doc = sample_document(10);

        let err = compositor
            .compose(&doc, &CompositionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::MediaError::PreconditionFailed(_)));
        // Nothing rendered.
        assert!(!dir.path().join("video").exists());
    }
}
