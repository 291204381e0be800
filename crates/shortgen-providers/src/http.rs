//! Shared HTTP plumbing for provider clients.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use shortgen_media::{move_file, partial_path};

use crate::error::{ProviderError, ProviderResult};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the client every provider uses.
pub fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("shortgen/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ProviderError::Network)
}

/// Read an API key from the environment, treating blank values as unset.
pub fn api_key_from_env(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Pass through successful responses; turn everything else into an error
/// carrying the response body.
pub async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_http_status(status, truncate(&body, 500)))
}

/// Stream `response` into `output` through a scratch file.
pub async fn save_response(mut response: Response, output: &Path) -> ProviderResult<u64> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = partial_path(output);
    let mut file = tokio::fs::File::create(&tmp).await?;
    let mut written = 0u64;

    let copied: ProviderResult<()> = async {
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = copied {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if written == 0 {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ProviderError::InvalidResponse("empty download".to_string()));
    }

    move_file(&tmp, output).await?;
    debug!("Saved {} bytes to {}", written, output.display());
    Ok(written)
}

/// GET `url` and save the body to `output`.
pub async fn download(client: &Client, url: &str, output: &Path) -> ProviderResult<u64> {
    let response = check_status(client.get(url).send().await?).await?;
    save_response(response, output).await
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
