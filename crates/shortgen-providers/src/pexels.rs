//! Stock photo search.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use shortgen_models::AssetKind;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{api_key_from_env, build_client, check_status, download, DEFAULT_REQUEST_TIMEOUT};
use crate::provider::{AssetProvider, GenerationRequest};

pub const PEXELS_API_KEY_VAR: &str = "PEXELS_API_KEY";

/// Generic queries tried when nothing matches the scene.
const FALLBACK_QUERIES: [&str; 5] = [
    "technology abstract",
    "digital innovation",
    "modern workspace",
    "creative design",
    "nature landscape",
];

#[derive(Debug, Clone)]
pub struct PexelsConfig {
    pub api_key: String,
    pub base_url: String,
    pub per_page: u32,
    pub timeout: Duration,
}

impl PexelsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.pexels.com".to_string(),
            per_page: 5,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> ProviderResult<Self> {
        let api_key =
            api_key_from_env(PEXELS_API_KEY_VAR).ok_or(ProviderError::MissingApiKey(PEXELS_API_KEY_VAR))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("PEXELS_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    portrait: Option<String>,
    large: Option<String>,
    original: Option<String>,
}

impl PhotoSources {
    fn best(&self) -> Option<&str> {
        self.portrait
            .as_deref()
            .or(self.large.as_deref())
            .or(self.original.as_deref())
    }
}

/// Searches Pexels for a portrait photo per scene.
pub struct PexelsProvider {
    http: Client,
    config: PexelsConfig,
}

impl PexelsProvider {
    pub fn new(config: PexelsConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(PexelsConfig::from_env()?)
    }

    /// First usable photo URL for `query`, if any.
    async fn search(&self, query: &str) -> ProviderResult<Option<String>> {
        let url = format!("{}/v1/search", self.config.base_url);
        let per_page = self.config.per_page.to_string();
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.config.api_key)
            .query(&[
                ("query", query),
                ("orientation", "portrait"),
                ("size", "large"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;

        let body: SearchResponse = check_status(response).await?.json().await?;
        let found = body
            .photos
            .iter()
            .find_map(|p| p.src.best().map(|url| (p.id, url.to_string())));
        if let Some((id, _)) = &found {
            debug!("Pexels photo {} matched '{}'", id, query);
        }
        Ok(found.map(|(_, url)| url))
    }
}

/// Queries to try for a scene, most specific first.
pub fn query_ladder(query: &str) -> Vec<String> {
    let mut ladder = Vec::new();
    let trimmed = query.trim();
    if !trimmed.is_empty() {
        ladder.push(trimmed.to_string());
        let short: Vec<&str> = trimmed.split_whitespace().take(2).collect();
        let short = short.join(" ");
        if short != trimmed {
            ladder.push(short);
        }
    }
    ladder.extend(FALLBACK_QUERIES.iter().map(|q| q.to_string()));
    ladder
}

#[async_trait]
impl AssetProvider for PexelsProvider {
    fn kind(&self) -> AssetKind {
        AssetKind::WebImage
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        let scene = request.scene()?;

        for query in query_ladder(&scene.visual.search_query) {
            if let Some(url) = self.search(&query).await? {
                download(&self.http, &url, request.output).await?;
                info!(scene_index = scene.index, "Downloaded stock photo for '{}'", query);
                return Ok(());
            }
        }

        Err(ProviderError::NoResult(format!(
            "no photo for scene {} ('{}')",
            scene.index, scene.visual.search_query
        )))
    }
}
