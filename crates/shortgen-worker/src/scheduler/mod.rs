//! Scene scheduling: turns source content into a fresh script document.
//!
//! The scene count is `target / unit`, every scene lasts exactly one unit,
//! and the narration is split so each scene gets a non-empty contiguous
//! slice. Content too thin to fill every scene is rejected rather than
//! padded.

pub mod content;

use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use shortgen_models::{
    join_narration, Artifacts, AudioConfig, Narration, Orientation, PipelinePhase, Scene,
    ScriptDocument, Style, VisualDescriptor, VisualMode, SCHEMA_VERSION, WORDS_PER_SECOND,
};

use crate::error::{ConfigurationError, PipelineResult};
use content::Section;

/// Recommended target window in seconds; outside it only warns.
pub const RECOMMENDED_DURATION: (u32, u32) = (30, 90);

const FALLBACK_QUERY: &str = "abstract visual";

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "of", "in", "at", "to", "for", "on", "and", "or", "but", "is", "are",
        "was", "were", "with", "from", "by", "as", "its", "this", "that", "how", "what", "when",
        "where", "why", "which",
    ]
    .into_iter()
    .collect()
});

/// What to schedule.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub style: Style,
    pub target_duration_seconds: u32,
    pub visual_mode: VisualMode,
    /// Overrides the style's default voice.
    pub voice: Option<String>,
    pub subtitles: bool,
    pub source_file: Option<PathBuf>,
}

impl ScheduleRequest {
    pub fn new(style: Style, target_duration_seconds: u32, visual_mode: VisualMode) -> Self {
        Self {
            style,
            target_duration_seconds,
            visual_mode,
            voice: None,
            subtitles: false,
            source_file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneScheduler {
    unit_seconds: u32,
}

impl SceneScheduler {
    pub fn new(unit_seconds: u32) -> Self {
        Self { unit_seconds }
    }

    /// Number of scenes for `target`, or why that target is unusable.
    pub fn scene_count(&self, target: u32) -> Result<usize, ConfigurationError> {
        if self.unit_seconds == 0 {
            return Err(ConfigurationError::ZeroUnit);
        }
        if target == 0 || target % self.unit_seconds != 0 {
            return Err(ConfigurationError::InvalidDuration {
                target,
                unit: self.unit_seconds,
            });
        }
        Ok((target / self.unit_seconds) as usize)
    }

    /// Words of narration one scene can hold.
    pub fn words_per_scene(&self) -> usize {
        (f64::from(self.unit_seconds) * WORDS_PER_SECOND).floor() as usize
    }

    /// Build the initial document for `source`.
    pub fn schedule(&self, request: &ScheduleRequest, source: &str) -> PipelineResult<ScriptDocument> {
        let target = request.target_duration_seconds;
        let count = self.scene_count(target)?;
        if target < RECOMMENDED_DURATION.0 || target > RECOMMENDED_DURATION.1 {
            warn!(
                "Target {}s is outside the recommended {}-{}s window",
                target, RECOMMENDED_DURATION.0, RECOMMENDED_DURATION.1
            );
        }

        let body = content::strip_front_matter(source);
        let title = content::extract_title(body);
        let sections: Vec<Section> = content::extract_sections(body)
            .into_iter()
            .map(|s| Section {
                body: normalize_whitespace(&s.body),
                title: s.title,
            })
            .collect();

        let slices = if sections.len() >= count {
            debug!("Selecting {} of {} sections", count, sections.len());
            self.from_sections(&sections, count)
        } else {
            debug!("{} sections for {} scenes, splitting pooled text", sections.len(), count);
            let pooled = if sections.is_empty() {
                normalize_whitespace(&content::clean_text(body))
            } else {
                sections
                    .iter()
                    .map(|s| s.body.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            let budget = (f64::from(target) * WORDS_PER_SECOND).floor() as usize;
            split_pooled(&pooled, count, budget)?
        };

        let scenes: Vec<Scene> = slices
            .into_iter()
            .enumerate()
            .map(|(position, slice)| {
                let query = image_query(&slice.title, &slice.body);
                Scene {
                    index: position as u32 + 1,
                    title: slice.title,
                    narration_text: slice.body,
                    duration_seconds: self.unit_seconds,
                    visual_type: request.visual_mode.visual_type_for(position, count),
                    visual: VisualDescriptor {
                        image_prompt: image_prompt(&query),
                        motion_prompt: motion_prompt(&query),
                        search_query: query,
                    },
                    image_path: None,
                    video_path: None,
                }
            })
            .collect();

        let narration = join_narration(scenes.iter().map(|s| s.narration_text.as_str()));
        let doc = ScriptDocument {
            version: SCHEMA_VERSION,
            phase: PipelinePhase::Scheduled,
            description: hashtags(&title),
            title,
            style: request.style,
            visual_mode: request.visual_mode,
            voice: request
                .voice
                .clone()
                .unwrap_or_else(|| request.style.default_voice().to_string()),
            orientation: Orientation::Portrait,
            subtitles: request.subtitles,
            target_duration_seconds: target,
            unit_duration_seconds: self.unit_seconds,
            narration: Narration { text: narration },
            audio_config: AudioConfig::for_style(request.style),
            scenes,
            artifacts: Artifacts::default(),
            source_file: request.source_file.clone(),
            created_at: Utc::now(),
        };
        doc.validate()?;

        info!(
            "Scheduled '{}': {} scenes x {}s ({})",
            doc.title, count, self.unit_seconds, doc.visual_mode
        );
        Ok(doc)
    }

    fn from_sections(&self, sections: &[Section], count: usize) -> Vec<Section> {
        let budget = self.words_per_scene().max(1);
        content::select_sections(sections, count)
            .into_iter()
            .map(|s| Section {
                body: content::condense(&s.body, budget),
                title: s.title,
            })
            .collect()
    }
}

/// Split pooled text into `count` near-equal runs after capping it at
/// `budget` words.
fn split_pooled(pooled: &str, count: usize, budget: usize) -> Result<Vec<Section>, ConfigurationError> {
    let words: Vec<&str> = pooled.split_whitespace().collect();
    if words.len() < count {
        return Err(ConfigurationError::InsufficientContent {
            words: words.len(),
            scenes: count,
        });
    }
    let capped = &words[..words.len().min(budget.max(count))];

    Ok(content::split_even(capped, count)
        .into_iter()
        .map(|run| {
            let body = run.join(" ");
            let title = content::truncate_chars(&run.iter().take(6).copied().collect::<Vec<_>>().join(" "), 50);
            Section { title, body }
        })
        .collect())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect()
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word.to_lowercase().as_str())
}

/// Up to four non-stop-words from the title, the body when the title has
/// fewer than two.
pub fn image_query(title: &str, body: &str) -> String {
    let pick = |text: &str| -> Vec<String> {
        strip_punctuation(text)
            .split_whitespace()
            .filter(|w| !is_stop_word(w))
            .take(4)
            .map(str::to_string)
            .collect()
    };

    let mut words = pick(title);
    if words.len() < 2 && !body.trim().is_empty() {
        words = pick(body);
    }
    if words.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        words.join(" ")
    }
}

pub fn image_prompt(query: &str) -> String {
    format!(
        "A cinematic, vibrant illustration depicting: {query}. Vertical portrait composition, \
         9:16 aspect ratio, bold colors, modern aesthetic, social media style."
    )
}

pub fn motion_prompt(query: &str) -> String {
    format!("Subtle camera push-in, gentle movement, cinematic feel, depicting {query}")
}

/// Hashtag line from the title's significant words.
pub fn hashtags(title: &str) -> String {
    let tags: Vec<String> = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > 3 && !is_stop_word(w))
        .take(4)
        .map(|w| format!("#{w}"))
        .collect();

    if tags.is_empty() {
        "#shorts #reels".to_string()
    } else {
        format!("{} #shorts #reels", tags.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::VisualType;

    const ARTICLE: &str = "# The Secret Life of Bees\n\n\
        ## Pollination\nBees pollinate a third of the crops we eat. Without them, diets would change.\n\n\
        ## Communication\nHoney bees dance to share where flowers are. The waggle dance encodes distance.\n\n\
        ## Colonies\nA hive holds up to 60,000 bees. Each has one queen.\n\n\
        ## Decline\nColonies fell 40% last winter. Scientists call it critical.\n\n\
        ## Threats\nPesticides and mites weaken hives. Habitat loss makes it worse.\n\n\
        ## Action\nPlant native flowers. Skip pesticides in your garden.\n\n\
        ## Outlook\nWith care, bees can recover. Every garden helps.\n";

    fn scheduler() -> SceneScheduler {
        SceneScheduler::new(5)
    }

    #[test]
    fn test_scene_count_validation() {
        assert_eq!(scheduler().scene_count(30).unwrap(), 6);
        assert!(matches!(
            scheduler().scene_count(32),
            Err(ConfigurationError::InvalidDuration { target: 32, unit: 5 })
        ));
        assert!(scheduler().scene_count(0).is_err());
        assert!(matches!(SceneScheduler::new(0).scene_count(30), Err(ConfigurationError::ZeroUnit)));
    }

    #[test]
    fn test_mixed_thirty_second_schedule() {
        let request = ScheduleRequest::new(Style::Educational, 30, VisualMode::Mixed);
        let doc = scheduler().schedule(&request, ARTICLE).unwrap();

        assert_eq!(doc.title, "The Secret Life of Bees");
        assert_eq!(doc.scenes.len(), 6);
        assert_eq!(doc.total_scene_seconds(), 30);
        assert!(doc.scenes.iter().all(|s| s.duration_seconds == 5));
        assert!(doc.scenes.iter().all(|s| !s.narration_text.trim().is_empty()));

        let types: Vec<_> = doc.scenes.iter().map(|s| s.visual_type).collect();
        assert_eq!(types[0], VisualType::GeneratedVideo);
        assert_eq!(types[5], VisualType::GeneratedVideo);
        assert!(types[1..5].iter().all(|t| *t == VisualType::WebImage));

        assert_eq!(doc.audio_config.narration_volume, 1.0);
        assert_eq!(doc.audio_config.music_volume, 0.15);
        assert_eq!(doc.voice, "aura-2-asteria-en");
        assert_eq!(doc.narration.text, doc.joined_narration());
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_sections_are_condensed_to_budget() {
        let request = ScheduleRequest::new(Style::Hype, 30, VisualMode::WebImages);
        let doc = scheduler().schedule(&request, ARTICLE).unwrap();
        for scene in &doc.scenes {
            assert!(scene.narration_text.split_whitespace().count() <= 12, "{}", scene.narration_text);
        }
        // Decline scores high on numbers and strong words.
        assert!(doc.scenes.iter().any(|s| s.title == "Decline"));
    }

    #[test]
    fn test_pooled_split_for_thin_structure() {
        let text = "One long paragraph without headings that keeps going with plenty of words \
                    to share between every scene of a short video about nothing much at all.";
        let request = ScheduleRequest::new(Style::Storytelling, 30, VisualMode::AiImages);
        let doc = scheduler().schedule(&request, text).unwrap();

        assert_eq!(doc.scenes.len(), 6);
        let counts: Vec<usize> = doc
            .scenes
            .iter()
            .map(|s| s.narration_text.split_whitespace().count())
            .collect();
        let (min, max) = (counts.iter().min().unwrap(), counts.iter().max().unwrap());
        assert!(max - min <= 1);
        assert!(doc.scenes.iter().all(|s| s.visual_type == VisualType::GeneratedImage));
        // Slices are contiguous: joining them restores the text.
        assert_eq!(doc.narration.text, normalize_whitespace(text));
    }

    #[test]
    fn test_insufficient_content_is_rejected() {
        let request = ScheduleRequest::new(Style::Educational, 30, VisualMode::WebImages);
        let err = scheduler().schedule(&request, "Too few words").unwrap_err();
        assert!(matches!(
            err,
            crate::PipelineError::Configuration(ConfigurationError::InsufficientContent {
                words: 3,
                scenes: 6
            })
        ));
    }

    #[test]
    fn test_every_valid_target_sums_exactly() {
        let words = vec!["word"; 400].join(" ");
        for target in (5..=120).step_by(5) {
            let request = ScheduleRequest::new(Style::Educational, target, VisualMode::Mixed);
            let doc = scheduler().schedule(&request, &words).unwrap();
            assert_eq!(doc.scenes.len() as u32, target / 5);
            assert_eq!(doc.total_scene_seconds(), target);
        }
    }

    #[test]
    fn test_image_query() {
        assert_eq!(image_query("The Rise of Solar Power", ""), "Rise Solar Power");
        assert_eq!(image_query("Why", "Bees pollinate the crops we eat"), "Bees pollinate crops we");
        assert_eq!(image_query("", ""), FALLBACK_QUERY);
    }

    #[test]
    fn test_prompts_and_hashtags() {
        assert!(image_prompt("solar panels").contains("depicting: solar panels."));
        assert!(motion_prompt("solar panels").ends_with("depicting solar panels"));
        assert_eq!(hashtags("The Secret Life of Bees!"), "#secret #life #bees #shorts #reels");
        assert_eq!(hashtags("A to Z"), "#shorts #reels");
    }
}
