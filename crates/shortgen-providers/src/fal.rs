//! fal.ai queue client and the providers built on it: image-to-video clips
//! and background music.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use shortgen_models::AssetKind;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{api_key_from_env, build_client, check_status, download, DEFAULT_REQUEST_TIMEOUT};
use crate::provider::{AssetProvider, GenerationRequest};

pub const FAL_KEY_VAR: &str = "FAL_KEY";

pub const DEFAULT_VIDEO_MODEL: &str = "fal-ai/kling-video/v2.1/standard/image-to-video";
pub const DEFAULT_MUSIC_MODEL: &str = "cassetteai/music-generator";

/// Music length accepted by the generator, in seconds.
const MUSIC_DURATION_RANGE: (u32, u32) = (5, 150);

#[derive(Debug, Clone)]
pub struct FalConfig {
    pub api_key: String,
    pub queue_url: String,
    pub video_model: String,
    pub music_model: String,
    pub poll_interval: Duration,
    /// Upper bound on queue wait plus generation time per request.
    pub max_wait: Duration,
    pub timeout: Duration,
}

impl FalConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            queue_url: "https://queue.fal.run".to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            music_model: DEFAULT_MUSIC_MODEL.to_string(),
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> ProviderResult<Self> {
        let api_key = api_key_from_env(FAL_KEY_VAR).ok_or(ProviderError::MissingApiKey(FAL_KEY_VAR))?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("FAL_QUEUE_URL") {
            config.queue_url = url;
        }
        if let Ok(model) = std::env::var("FAL_VIDEO_MODEL") {
            config.video_model = model;
        }
        if let Ok(model) = std::env::var("FAL_MUSIC_MODEL") {
            config.music_model = model;
        }
        if let Some(secs) = std::env::var("FAL_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = std::env::var("FAL_MAX_WAIT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.max_wait = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_queue_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = url.into();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = interval;
        self.max_wait = max_wait;
        self
    }
}

#[derive(Debug, Deserialize)]
struct QueueTicket {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
}

/// Submit-poll-fetch client for the fal.ai request queue.
#[derive(Clone)]
pub struct FalClient {
    http: Client,
    config: FalConfig,
}

impl FalClient {
    pub fn new(config: FalConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(FalConfig::from_env()?)
    }

    pub fn config(&self) -> &FalConfig {
        &self.config
    }

    fn auth(&self) -> String {
        format!("Key {}", self.config.api_key)
    }

    /// Run `model` on `input` and decode its result.
    pub async fn run<I, O>(&self, model: &str, input: &I) -> ProviderResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.queue_url, model);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth())
            .json(input)
            .send()
            .await?;
        let ticket: QueueTicket = check_status(response).await?.json().await?;
        debug!("Queued fal request {} on {}", ticket.request_id, model);

        self.wait_for(&ticket).await?;

        let response = self
            .http
            .get(&ticket.response_url)
            .header("Authorization", self.auth())
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn wait_for(&self, ticket: &QueueTicket) -> ProviderResult<()> {
        let started = Instant::now();
        loop {
            let response = self
                .http
                .get(&ticket.status_url)
                .header("Authorization", self.auth())
                .send()
                .await?;
            let status: QueueStatus = check_status(response).await?.json().await?;

            match status.status.as_str() {
                "COMPLETED" => return Ok(()),
                "IN_QUEUE" | "IN_PROGRESS" => {}
                other => {
                    return Err(ProviderError::InvalidResponse(format!(
                        "request {} in unexpected state {other}",
                        ticket.request_id
                    )))
                }
            }

            if started.elapsed() >= self.config.max_wait {
                return Err(ProviderError::Timeout(self.config.max_wait.as_secs()));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileRef {
    url: String,
}

#[derive(Debug, Serialize)]
struct VideoInput<'a> {
    prompt: &'a str,
    image_url: String,
    duration: &'static str,
    aspect_ratio: &'static str,
}

#[derive(Debug, Deserialize)]
struct VideoOutput {
    video: Option<FileRef>,
}

/// Animates a scene's still into a short clip.
pub struct FalVideoProvider {
    client: FalClient,
}

impl FalVideoProvider {
    pub fn new(client: FalClient) -> Self {
        Self { client }
    }
}

/// Clip lengths the video model offers.
pub fn clip_duration_for(scene_seconds: u32) -> &'static str {
    if scene_seconds <= 5 {
        "5"
    } else {
        "10"
    }
}

/// Inline an image file as a data URI.
pub async fn image_data_uri(path: &Path) -> ProviderResult<String> {
    let bytes = tokio::fs::read(path).await?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

#[async_trait]
impl AssetProvider for FalVideoProvider {
    fn kind(&self) -> AssetKind {
        AssetKind::GeneratedVideo
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        let scene = request.scene()?;
        let still = scene.image_path.as_deref().ok_or_else(|| {
            ProviderError::Precondition(format!("scene {} has no source image", scene.index))
        })?;

        let input = VideoInput {
            prompt: &scene.visual.motion_prompt,
            image_url: image_data_uri(still).await?,
            duration: clip_duration_for(scene.duration_seconds),
            aspect_ratio: "9:16",
        };
        let output: VideoOutput = self.client.run(&self.client.config().video_model, &input).await?;
        let video = output
            .video
            .ok_or_else(|| ProviderError::InvalidResponse("result has no video".to_string()))?;

        download(&self.client.http, &video.url, request.output).await?;
        info!(scene_index = scene.index, "Generated motion clip");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MusicInput<'a> {
    prompt: &'a str,
    duration: u32,
}

#[derive(Debug, Deserialize)]
struct MusicOutput {
    audio_file: Option<FileRef>,
    audio: Option<FileRef>,
}

/// Generates one background track per document.
pub struct FalMusicProvider {
    client: FalClient,
}

impl FalMusicProvider {
    pub fn new(client: FalClient) -> Self {
        Self { client }
    }
}

pub fn music_duration_for(target_seconds: u32) -> u32 {
    target_seconds.clamp(MUSIC_DURATION_RANGE.0, MUSIC_DURATION_RANGE.1)
}

#[async_trait]
impl AssetProvider for FalMusicProvider {
    fn kind(&self) -> AssetKind {
        AssetKind::Music
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        let doc = request.doc;
        let input = MusicInput {
            prompt: &doc.audio_config.music_prompt,
            duration: music_duration_for(doc.target_duration_seconds),
        };
        let output: MusicOutput = self.client.run(&self.client.config().music_model, &input).await?;
        let track = output
            .audio_file
            .or(output.audio)
            .ok_or_else(|| ProviderError::InvalidResponse("result has no audio".to_string()))?;

        download(&self.client.http, &track.url, request.output).await?;
        info!("Generated {}s music track", input.duration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document_with_mode;
    use shortgen_models::{VisualMode, WorkItem};
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FalClient {
        FalClient::new(
            FalConfig::new("fal-key")
                .with_queue_url(server.uri())
                .with_polling(Duration::from_millis(10), Duration::from_millis(200)),
        )
        .unwrap()
    }

    async fn mount_queue(server: &MockServer, model: &str, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/{model}")))
            .and(header("Authorization", "Key fal-key"))
            .respond_with(ticket(server))
            .mount(server)
            .await;
        mount_result(server, result).await;
    }

    fn ticket(server: &MockServer) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-1",
            "status_url": format!("{}/requests/req-1/status", server.uri()),
            "response_url": format!("{}/requests/req-1", server.uri()),
        }))
    }

    async fn mount_result(server: &MockServer, result: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/requests/req-1/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "COMPLETED" })),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/requests/req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(result))
            .mount(server)
            .await;
    }

    #[test]
    fn test_durations() {
        assert_eq!(clip_duration_for(5), "5");
        assert_eq!(clip_duration_for(10), "10");
        assert_eq!(music_duration_for(3), 5);
        assert_eq!(music_duration_for(60), 60);
        assert_eq!(music_duration_for(400), 150);
    }

    #[tokio::test]
    async fn test_image_data_uri() {
        let dir = TempDir::new().unwrap();
        let still = dir.path().join("scene-1.png");
        std::fs::write(&still, b"png").unwrap();
        assert_eq!(image_data_uri(&still).await.unwrap(), "data:image/png;base64,cG5n");
    }

    #[tokio::test]
    async fn test_video_from_still() {
        let server = MockServer::start().await;
        mount_queue(
            &server,
            DEFAULT_VIDEO_MODEL,
            serde_json::json!({ "video": { "url": format!("{}/out/clip.mp4", server.uri()) } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/out/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let still = dir.path().join("scene-1.jpg");
        std::fs::write(&still, b"jpg").unwrap();

        let mut doc = sample_document_with_mode(30, VisualMode::Mixed);
        doc.scenes[0].image_path = Some(still);
        let output = dir.path().join("videos").join("scene-1.mp4");
        let request = GenerationRequest::new(&doc, WorkItem::Scene(1), &output);

        FalVideoProvider::new(client(&server)).generate(&request).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"mp4");
    }

    #[tokio::test]
    async fn test_video_requires_still() {
        let server = MockServer::start().await;
        let doc = sample_document_with_mode(30, VisualMode::Mixed);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("scene-6.mp4");
        let request = GenerationRequest::new(&doc, WorkItem::Scene(6), &output);

        let err = FalVideoProvider::new(client(&server))
            .generate(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_music_track() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{DEFAULT_MUSIC_MODEL}")))
            .and(body_partial_json(serde_json::json!({ "duration": 30 })))
            .respond_with(ticket(&server))
            .expect(1)
            .mount(&server)
            .await;
        mount_result(
            &server,
            serde_json::json!({ "audio_file": { "url": format!("{}/out/music.mp3", server.uri()) } }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/out/music.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
            .mount(&server)
            .await;

        let doc = sample_document_with_mode(30, VisualMode::WebImages);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("audio").join("music.mp3");
        let request = GenerationRequest::new(&doc, WorkItem::Document, &output);

        FalMusicProvider::new(client(&server)).generate(&request).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"mp3");
    }

    #[tokio::test]
    async fn test_queue_wait_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "slow",
                "status_url": format!("{}/requests/slow/status", server.uri()),
                "response_url": format!("{}/requests/slow", server.uri()),
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/requests/slow/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "IN_QUEUE" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .run::<_, serde_json::Value>("some/model", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }
}
