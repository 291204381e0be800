//! Up-front cost estimate for a run.

use serde::Serialize;

use crate::VisualMode;

/// Narration synthesis, per short.
pub const COST_NARRATION_USD: f64 = 0.01;
/// Music generation, per short.
pub const COST_MUSIC_USD: f64 = 0.05;
/// One generated still.
pub const COST_GENERATED_IMAGE_USD: f64 = 0.04;
/// One image-to-video clip.
pub const COST_VIDEO_CLIP_USD: f64 = 0.10;
/// Stock image search is free.
pub const COST_WEB_IMAGE_USD: f64 = 0.0;

/// Estimated spend per asset category, in US dollars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub narration: f64,
    pub music: f64,
    pub images: f64,
    pub video_clips: f64,
}

impl CostEstimate {
    pub fn total(&self) -> f64 {
        self.narration + self.music + self.images + self.video_clips
    }
}

/// Estimate the external spend of a fresh run.
///
/// Every generated-video scene also pays for its source still.
pub fn estimate_cost(scene_count: usize, mode: VisualMode, music: bool) -> CostEstimate {
    let mut images = 0.0;
    let mut video_clips = 0.0;
    for position in 0..scene_count {
        match mode.visual_type_for(position, scene_count) {
            crate::VisualType::WebImage => images += COST_WEB_IMAGE_USD,
            crate::VisualType::GeneratedImage => images += COST_GENERATED_IMAGE_USD,
            crate::VisualType::GeneratedVideo => {
                images += COST_GENERATED_IMAGE_USD;
                video_clips += COST_VIDEO_CLIP_USD;
            }
        }
    }

    CostEstimate {
        narration: COST_NARRATION_USD,
        music: if music { COST_MUSIC_USD } else { 0.0 },
        images,
        video_clips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_images_only_pay_for_audio() {
        let estimate = estimate_cost(6, VisualMode::WebImages, true);
        assert_eq!(estimate.images, 0.0);
        assert!((estimate.total() - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_pays_for_two_clips() {
        let estimate = estimate_cost(6, VisualMode::Mixed, false);
        assert!((estimate.video_clips - 0.20).abs() < 1e-9);
        assert!((estimate.images - 0.08).abs() < 1e-9);
        assert_eq!(estimate.music, 0.0);
    }
}
