//! Narration synthesis with the Deepgram speak API.
//!
//! Long scripts are sent in sentence-aligned chunks and the returned MP3
//! segments are joined with the concat demuxer.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use shortgen_media::{concat_files, move_file, FfmpegRunner};
use shortgen_models::{AssetKind, WORDS_PER_SECOND};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{api_key_from_env, build_client, check_status, save_response, DEFAULT_REQUEST_TIMEOUT};
use crate::provider::{AssetProvider, GenerationRequest};

pub const DEEPGRAM_API_KEY_VAR: &str = "DEEPGRAM_API_KEY";

/// Longest text accepted by one speak request.
pub const MAX_CHUNK_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_chunk_chars: usize,
    pub timeout: Duration,
}

impl DeepgramConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.deepgram.com".to_string(),
            max_chunk_chars: MAX_CHUNK_CHARS,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> ProviderResult<Self> {
        let api_key = api_key_from_env(DEEPGRAM_API_KEY_VAR)
            .ok_or(ProviderError::MissingApiKey(DEEPGRAM_API_KEY_VAR))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("DEEPGRAM_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_chunk_chars(mut self, max: usize) -> Self {
        self.max_chunk_chars = max;
        self
    }
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

/// Speaks the document narration in the document's voice.
pub struct DeepgramProvider {
    http: Client,
    config: DeepgramConfig,
    runner: FfmpegRunner,
}

impl DeepgramProvider {
    pub fn new(config: DeepgramConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout)?;
        Ok(Self {
            http,
            config,
            runner: FfmpegRunner::new(),
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(DeepgramConfig::from_env()?)
    }

    /// Runner used when joining chunked audio.
    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    async fn speak(&self, voice: &str, text: &str, output: &Path) -> ProviderResult<()> {
        let url = format!("{}/v1/speak", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.config.api_key))
            .query(&[("model", voice), ("encoding", "mp3")])
            .json(&SpeakRequest { text })
            .send()
            .await?;
        save_response(check_status(response).await?, output).await?;
        Ok(())
    }
}

/// Split `text` into chunks of at most `max_chars`, preferring sentence
/// boundaries and falling back to word boundaries.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if sentence.chars().count() <= max_chars {
            append_piece(sentence, max_chars, &mut current, &mut chunks);
        } else {
            for word in sentence.split_whitespace() {
                append_piece(word, max_chars, &mut current, &mut chunks);
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn append_piece(piece: &str, max_chars: usize, current: &mut String, chunks: &mut Vec<String>) {
    if !current.is_empty() && current.chars().count() + 1 + piece.chars().count() > max_chars {
        chunks.push(std::mem::take(current));
    }
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(piece);
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let next_is_space = chars.peek().map(|(_, n)| n.is_whitespace()).unwrap_or(true);
            if next_is_space {
                let end = idx + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Rough spoken length of `text` in seconds.
pub fn estimated_seconds(text: &str) -> f64 {
    text.split_whitespace().count() as f64 / WORDS_PER_SECOND
}

#[async_trait]
impl AssetProvider for DeepgramProvider {
    fn kind(&self) -> AssetKind {
        AssetKind::Narration
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()> {
        let doc = request.doc;
        let text = doc.narration.text.trim();
        if text.is_empty() {
            return Err(ProviderError::Precondition("narration text is empty".to_string()));
        }

        let target = f64::from(doc.target_duration_seconds);
        let estimate = estimated_seconds(text);
        if estimate > target * 1.3 || estimate < target * 0.5 {
            warn!(
                "Narration should run about {:.0}s against a {:.0}s target",
                estimate, target
            );
        }

        let chunks = chunk_text(text, self.config.max_chunk_chars);
        if chunks.len() == 1 {
            self.speak(&doc.voice, &chunks[0], request.output).await?;
        } else {
            let parent = request
                .output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            tokio::fs::create_dir_all(&parent).await?;
            let scratch = tempfile::Builder::new().prefix(".narration-").tempdir_in(&parent)?;

            let mut parts = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                let part = scratch.path().join(format!("part-{:03}.mp3", i + 1));
                self.speak(&doc.voice, chunk, &part).await?;
                debug!("Narration chunk {}/{} done", i + 1, chunks.len());
                parts.push(part);
            }

            let joined = scratch.path().join("joined.mp3");
            concat_files(&self.runner, &parts, &scratch.path().join("parts.txt"), &joined).await?;
            move_file(&joined, request.output).await?;
        }

        info!(
            "Synthesized narration with {} ({} chunk(s), ~{:.0}s)",
            doc.voice,
            chunks.len(),
            estimate
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document;
    use shortgen_models::WorkItem;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("One. Two! Three?", 2000);
        assert_eq!(chunks, vec!["One. Two! Three?"]);
    }

    #[test]
    fn test_chunks_break_at_sentences() {
        let text = "First sentence here. Second sentence here. Third one.";
        let chunks = chunk_text(text, 25);
        assert_eq!(
            chunks,
            vec!["First sentence here.", "Second sentence here.", "Third one."]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
    }

    #[test]
    fn test_long_sentence_splits_on_words() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 12);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        assert_eq!(split_sentences("Costs fell 3.5 percent. Then rose."), vec![
            "Costs fell 3.5 percent.",
            "Then rose."
        ]);
    }

    #[test]
    fn test_estimated_seconds() {
        let words = vec!["word"; 25].join(" ");
        assert!((estimated_seconds(&words) - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_single_chunk_narration() {
        let server = MockServer::start().await;
        let doc = sample_document(10);

        Mock::given(method("POST"))
            .and(path("/v1/speak"))
            .and(query_param("model", doc.voice.as_str()))
            .and(query_param("encoding", "mp3"))
            .and(header("Authorization", "Token dg-key"))
            .and(body_json(serde_json::json!({ "text": doc.narration.text })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            DeepgramProvider::new(DeepgramConfig::new("dg-key").with_base_url(server.uri())).unwrap();
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("audio").join("narration.mp3");
        let request = GenerationRequest::new(&doc, WorkItem::Document, &output);

        provider.generate(&request).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"ID3audio");
    }

    #[tokio::test]
    async fn test_server_error_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("tts down"))
            .mount(&server)
            .await;

        let provider =
            DeepgramProvider::new(DeepgramConfig::new("dg-key").with_base_url(server.uri())).unwrap();
        let doc = sample_document(10);
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("narration.mp3");
        let request = GenerationRequest::new(&doc, WorkItem::Document, &output);

        let err = provider.generate(&request).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!output.exists());
    }
}
