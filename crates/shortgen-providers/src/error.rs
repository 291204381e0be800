//! Provider error types.

use reqwest::StatusCode;
use thiserror::Error;

use shortgen_media::MediaError;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("Service returned {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Rejected by content filter: {0}")]
    ContentFiltered(String),

    #[error("No result: {0}")]
    NoResult(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Scene {0} is not in the document")]
    UnknownScene(u32),

    #[error("Precondition not met: {0}")]
    Precondition(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Classify a non-success HTTP response.
    pub fn from_http_status(status: StatusCode, body: String) -> Self {
        ProviderError::Http { status, body }
    }

    /// Whether trying the same call again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || status.is_server_error()
            }
            ProviderError::Timeout(_) => true,
            ProviderError::Network(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Io(_) => true,
            ProviderError::MissingApiKey(_)
            | ProviderError::ContentFiltered(_)
            | ProviderError::NoResult(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::UnknownScene(_)
            | ProviderError::Precondition(_)
            | ProviderError::Json(_)
            | ProviderError::Decode(_)
            | ProviderError::Media(_) => false,
        }
    }
}
