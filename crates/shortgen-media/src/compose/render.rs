//! FFmpeg commands for each composition step.

use std::path::Path;

use shortgen_models::EncodingConfig;

use crate::command::FfmpegCommand;
use crate::filters::{audio_mix_filter, fit_and_hold_filter, ken_burns_filter, subtitles_burn_filter};

use super::plan::{ClipPlan, ClipSource, CompositionPlan};
use super::SubtitleMode;

/// Silent, exactly-timed clip for one scene.
pub fn clip_command(clip: &ClipPlan, plan: &CompositionPlan, encoding: &EncodingConfig, output: &Path) -> FfmpegCommand {
    let cmd = match &clip.source {
        ClipSource::Still { image, direction } => FfmpegCommand::new(image, output).video_filter(
            ken_burns_filter(*direction, plan.width, plan.height, plan.fps, clip.frames),
        ),
        ClipSource::Motion { video } => FfmpegCommand::new(video, output)
            .video_filter(fit_and_hold_filter(plan.width, plan.height, plan.fps, clip.duration)),
    };

    cmd.output_args(["-frames:v".to_string(), clip.frames.to_string()])
        .output_args(encoding.video_args())
        .duration(clip.duration)
        .no_audio()
}

/// Final pass: mux the concatenated video with the audio mix and, when
/// requested, subtitles.
///
/// Video is stream-copied unless subtitles are burned in.
pub fn final_command(
    plan: &CompositionPlan,
    encoding: &EncodingConfig,
    video: &Path,
    subtitle_mode: SubtitleMode,
    subtitle_file: Option<&Path>,
    output: &Path,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(video, output);
    let mut next_input = 1;
    if let Some(narration) = &plan.narration {
        cmd = cmd.add_input(&narration.path);
        next_input += 1;
    }
    if let Some(music) = &plan.music {
        cmd = cmd.add_input(&music.path).stream_loop();
        next_input += 1;
    }

    let (narration_track, music_track) = plan.audio_tracks();
    let audio_graph = audio_mix_filter(narration_track, music_track, plan.total_seconds);

    let burn = match (subtitle_mode, subtitle_file) {
        (SubtitleMode::Burn, Some(path)) => Some(subtitles_burn_filter(&path.to_string_lossy())),
        _ => None,
    };

    let mut graph = Vec::new();
    if let Some(burn) = &burn {
        graph.push(format!("[0:v]{burn}[vout]"));
    }
    if let Some(audio) = &audio_graph {
        graph.push(audio.clone());
    }
    if !graph.is_empty() {
        cmd = cmd.filter_complex(graph.join(";"));
    }

    cmd = if burn.is_some() {
        cmd.map("[vout]").output_args(encoding.video_args())
    } else {
        cmd.map("0:v").video_codec("copy")
    };

    cmd = if audio_graph.is_some() {
        cmd.map("[aout]").output_args(encoding.audio_args())
    } else {
        cmd.no_audio()
    };

    if let (SubtitleMode::Embed, Some(path)) = (subtitle_mode, subtitle_file) {
        cmd = cmd
            .add_input(path)
            .map(format!("{next_input}:s"))
            .output_args(["-c:s", "mov_text", "-metadata:s:s:0", "language=eng"]);
    }

    cmd.duration(plan.total_seconds)
        .output_args(["-movflags", "+faststart"])
}
