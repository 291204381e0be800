//! Document fixtures shared by unit and integration tests.

use chrono::{TimeZone, Utc};

use crate::{
    join_narration, AudioConfig, Artifacts, Narration, Orientation, PipelinePhase, Scene,
    ScriptDocument, Style, VisualDescriptor, VisualMode, DEFAULT_UNIT_SECONDS, SCHEMA_VERSION,
};

/// A valid web-images document with `target / 5` scenes and no artifacts.
pub fn sample_document(target: u32) -> ScriptDocument {
    sample_document_with_mode(target, VisualMode::WebImages)
}

/// A valid document whose visual types follow `mode`.
pub fn sample_document_with_mode(target: u32, mode: VisualMode) -> ScriptDocument {
    let count = (target / DEFAULT_UNIT_SECONDS) as usize;
    let scenes: Vec<Scene> = (0..count)
        .map(|position| {
            let index = position as u32 + 1;
            Scene {
                index,
                title: format!("Point {index}"),
                narration_text: format!("This is the narration for scene number {index}."),
                duration_seconds: DEFAULT_UNIT_SECONDS,
                visual_type: mode.visual_type_for(position, count),
                visual: VisualDescriptor {
                    search_query: format!("point {index}"),
                    image_prompt: format!("An illustration of point {index}"),
                    motion_prompt: "Subtle camera push-in".to_string(),
                },
                image_path: None,
                video_path: None,
            }
        })
        .collect();

    let narration = join_narration(scenes.iter().map(|s| s.narration_text.as_str()));

    ScriptDocument {
        version: SCHEMA_VERSION,
        phase: PipelinePhase::Scheduled,
        title: "Sample Short".to_string(),
        description: "Sample Short #shorts #reels".to_string(),
        style: Style::Educational,
        visual_mode: mode,
        voice: Style::Educational.default_voice().to_string(),
        orientation: Orientation::Portrait,
        subtitles: false,
        target_duration_seconds: target,
        unit_duration_seconds: DEFAULT_UNIT_SECONDS,
        narration: Narration { text: narration },
        audio_config: AudioConfig::for_style(Style::Educational),
        scenes,
        artifacts: Artifacts::default(),
        source_file: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
    }
}
