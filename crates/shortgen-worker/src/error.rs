//! Pipeline error types.

use thiserror::Error;

use shortgen_media::{MediaError, MissingArtifact};
use shortgen_models::{EnumParseError, PipelinePhase, ValidationError};
use shortgen_providers::ProviderError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Problems with the requested run, found before any external call.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Target duration {target}s is not a positive multiple of the {unit}s scene unit")]
    InvalidDuration { target: u32, unit: u32 },

    #[error("Scene unit must be positive")]
    ZeroUnit,

    #[error(transparent)]
    UnknownValue(#[from] EnumParseError),

    #[error("Content has {words} words, not enough for {scenes} scenes")]
    InsufficientContent { words: usize, scenes: usize },

    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigurationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Timing invariant violated: {0}")]
    TimingInvariant(String),

    #[error("Invalid document: {0}")]
    Validation(ValidationError),

    #[error("Cannot compose, missing artifacts: {}", format_missing(.0))]
    Precondition(Vec<MissingArtifact>),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Cancelled during {phase}")]
    Cancelled { phase: PipelinePhase },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_missing(missing: &[MissingArtifact]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        if err.is_timing() {
            PipelineError::TimingInvariant(err.to_string())
        } else {
            PipelineError::Validation(err)
        }
    }
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::PreconditionFailed(missing) => PipelineError::Precondition(missing),
            MediaError::TimingViolation(msg) => PipelineError::TimingInvariant(msg),
            MediaError::InvalidDocument(v) => v.into(),
            other => PipelineError::Media(other),
        }
    }
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingApiKey(var) => ConfigurationError::MissingApiKey(var).into(),
            other => PipelineError::Provider(other),
        }
    }
}

impl From<EnumParseError> for PipelineError {
    fn from(err: EnumParseError) -> Self {
        ConfigurationError::from(err).into()
    }
}

impl PipelineError {
    /// Short machine-readable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::TimingInvariant(_) => "timing_invariant",
            PipelineError::Validation(_) => "validation",
            PipelineError::Precondition(_) => "precondition",
            PipelineError::Media(_) => "media",
            PipelineError::Provider(_) => "provider",
            PipelineError::Cancelled { .. } => "cancelled",
            PipelineError::Io(_) => "io",
            PipelineError::Json(_) => "json",
        }
    }

    /// Whether the run stopped because something is wrong, as opposed to an
    /// operator-requested stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Cancelled { .. })
    }
}
