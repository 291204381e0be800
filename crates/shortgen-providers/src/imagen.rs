//! Still image generation through the Gemini Imagen endpoint.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use shortgen_media::write_atomic;
use shortgen_models::AssetKind;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{api_key_from_env, build_client, check_status, DEFAULT_REQUEST_TIMEOUT};
use crate::provider::{AssetProvider, GenerationRequest};

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone)]
pub struct ImagenConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ImagenConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "imagen-4.0-fast-generate-001".to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> ProviderResult<Self> {
        let api_key =
            api_key_from_env(GEMINI_API_KEY_VAR).ok_or(ProviderError::MissingApiKey(GEMINI_API_KEY_VAR))?;
        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("IMAGEN_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    sample_count: u32,
    aspect_ratio: &'static str,
    output_options: OutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    rai_filtered_reason: Option<String>,
}

/// Generates one 9:16 still per scene from its image prompt.
pub struct ImagenProvider {
    http: Client,
    config: ImagenConfig,
}

impl ImagenProvider {
    pub fn new(config: ImagenConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ImagenConfig::from_env()?)
    }

    async fn predict(&self, prompt: &str) -> ProviderResult<Vec<u8>> {
        let url = format!("{}/models/{}:predict", self.config.base_url, self.config.model);
        let body = PredictRequest {
            instances: [Instance { prompt }],
            parameters: Parameters {
                sample_count: 1,
                aspect_ratio: "9:16",
                output_options: OutputOptions {
                    mime_type: "image/jpeg",
                },
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: PredictResponse = check_status(response).await?.json().await?;

        let prediction = parsed.predictions.into_iter().next().ok_or_else(|| {
            ProviderError::ContentFiltered(format!("no image returned for prompt '{prompt}'"))
        })?;

        match prediction.bytes_base64_encoded {
            Some(encoded) => Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?),
            None => Err(ProviderError::ContentFiltered(
                prediction
                    .rai_filtered_reason
                    .unwrap_or_else(|| "image withheld".to_string()),
            )),
        }
    }
}

#[async_trait]
impl AssetProvider for ImagenProvider {
    fn kind(&self) -> AssetKind {
        AssetKind::GeneratedImage
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        let scene = request.scene()?;
        let bytes = self.predict(&scene.visual.image_prompt).await?;
        if bytes.is_empty() {
            return Err(ProviderError::InvalidResponse("empty image payload".to_string()));
        }
        write_atomic(request.output, &bytes).await?;
        info!(scene_index = scene.index, "Generated image ({} bytes)", bytes.len());
        Ok(())
    }
}
