//! HTTP client for a running firmware build service.
//!
//! Mirrors what a device-flashing app needs: request a build, look up its
//! metadata, download the binary.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use tokio::io::AsyncWriteExt;

use crate::domain::{BuildConfig, BuildId, FirmwareInfo};
use crate::server::{BuildResponse, ErrorBody};

/// Firmware service client
pub struct FirmwareClient {
    /// Base URL, without trailing slash
    base_url: String,
    client: reqwest::Client,
}

impl FirmwareClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL from path segments, percent-encoding each one
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid server URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Server URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Request a build, returning its identifier
    pub async fn build(&self, config: &BuildConfig) -> Result<BuildId> {
        let response = self
            .client
            .post(self.url(&["firmware"])?)
            .json(config)
            .send()
            .await
            .context("Failed to send build request")?;

        let response = check(response).await?;
        let body: BuildResponse = response
            .json()
            .await
            .context("Failed to parse build response")?;

        BuildId::parse(&body.hash).context("Server returned an unusable build identifier")
    }

    /// Fetch metadata of a build; `None` if the server does not know it
    pub async fn info(&self, id: &BuildId) -> Result<Option<FirmwareInfo>> {
        let response = self
            .client
            .get(self.url(&["firmware", id.as_str()])?)
            .send()
            .await
            .context("Failed to send info request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check(response).await?;
        let info = response
            .json()
            .await
            .context("Failed to parse firmware info")?;
        Ok(Some(info))
    }

    /// Download the binary of a build to `dest`, returning the byte count
    pub async fn download(&self, id: &BuildId, dest: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(self.url(&["firmware", id.as_str(), "bin"])?)
            .send()
            .await
            .context("Failed to send download request")?;

        if response.status() == StatusCode::NOT_FOUND {
            anyhow::bail!("Firmware not found: {}", id);
        }
        response = check(response).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.context("Failed to read firmware body")? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// Turn error statuses into errors carrying the server's message
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => anyhow::bail!("Server error {} ({}): {}", status, body.code, body.error),
        Err(_) => anyhow::bail!("Server error {}: {}", status, text.trim()),
    }
}
