//! Pipeline configuration.

use std::time::Duration;

use shortgen_media::DEFAULT_DURATION_TOLERANCE_SECS;
use shortgen_models::{EncodingConfig, DEFAULT_UNIT_SECONDS};

use crate::retry::RetryConfig;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum provider calls in flight within one phase
    pub max_scene_parallel: usize,
    /// Timeout for a single provider attempt
    pub item_timeout: Duration,
    /// Retries after the first attempt for retryable provider failures
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts
    pub retry_base_delay: Duration,
    /// Seconds per scene
    pub unit_seconds: u32,
    /// x264 preset for scene clips
    pub encoder_preset: String,
    /// x264 constant rate factor
    pub encoder_crf: u8,
    /// Allowed drift between the target and the composed duration
    pub duration_tolerance: f64,
    /// Timeout for a single ffmpeg invocation, in seconds
    pub ffmpeg_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_scene_parallel: 4,
            item_timeout: Duration::from_secs(900), // video generation queues are slow
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            unit_seconds: DEFAULT_UNIT_SECONDS,
            encoder_preset: "medium".to_string(),
            encoder_crf: 23,
            duration_tolerance: DEFAULT_DURATION_TOLERANCE_SECS,
            ffmpeg_timeout_secs: 900,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_scene_parallel: env_parse("SHORTGEN_FAN_OUT")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_scene_parallel),
            item_timeout: env_parse("SHORTGEN_ITEM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.item_timeout),
            max_retries: env_parse("SHORTGEN_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_base_delay: env_parse("SHORTGEN_RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            unit_seconds: env_parse("SHORTGEN_UNIT_SECONDS").unwrap_or(defaults.unit_seconds),
            encoder_preset: std::env::var("SHORTGEN_PRESET").unwrap_or(defaults.encoder_preset),
            encoder_crf: env_parse("SHORTGEN_CRF").unwrap_or(defaults.encoder_crf),
            duration_tolerance: env_parse("SHORTGEN_DURATION_TOLERANCE")
                .unwrap_or(defaults.duration_tolerance),
            ffmpeg_timeout_secs: env_parse("SHORTGEN_FFMPEG_TIMEOUT_SECS")
                .unwrap_or(defaults.ffmpeg_timeout_secs),
        }
    }

    /// Encoder settings for the compositor.
    pub fn encoding(&self) -> EncodingConfig {
        EncodingConfig::default()
            .with_preset(self.encoder_preset.clone())
            .with_crf(self.encoder_crf)
    }

    /// Retry policy for provider calls.
    pub fn retry(&self, operation_name: impl Into<String>) -> RetryConfig {
        RetryConfig::new(operation_name)
            .with_max_retries(self.max_retries)
            .with_base_delay(self.retry_base_delay)
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_scene_parallel, 4);
        assert_eq!(config.unit_seconds, 5);
        assert_eq!(config.max_retries, 2);

        let encoding = config.encoding();
        assert_eq!(encoding.preset, "medium");
        assert_eq!(encoding.crf, 23);
    }

    #[test]
    fn test_retry_policy_follows_config() {
        let config = PipelineConfig {
            max_retries: 5,
            ..Default::default()
        };
        assert_eq!(config.retry("narration").max_retries, 5);
    }
}
