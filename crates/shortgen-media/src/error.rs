//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use shortgen_models::ValidationError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// A required input the compositor could not find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtifact {
    /// Document field that should point at the file.
    pub field: String,
    /// Recorded path, when the field was set but the file is absent or empty.
    pub path: Option<PathBuf>,
}

impl std::fmt::Display for MissingArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({} missing or empty)", self.field, path.display()),
            None => write!(f, "{} (not set)", self.field),
        }
    }
}

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("Composition refused, missing artifacts: {}", format_missing(.0))]
    PreconditionFailed(Vec<MissingArtifact>),

    #[error("Timing invariant violated: {0}")]
    TimingViolation(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_missing(missing: &[MissingArtifact]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn timing(message: impl Into<String>) -> Self {
        Self::TimingViolation(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the failure came from the document rather than the media tools.
    pub fn is_structural(&self) -> bool {
        match self {
            MediaError::PreconditionFailed(_) | MediaError::TimingViolation(_) => true,
            MediaError::InvalidDocument(_) => true,
            _ => false,
        }
    }
}
