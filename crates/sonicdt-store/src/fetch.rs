//! Remote artifact download
//!
//! The body is streamed into a sibling `.part` file and renamed into place
//! once complete, so an interrupted download never looks like a cache hit.

use async_trait::async_trait;
use sonicdt_core::{SonicError, SonicResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Downloads a remote artifact to a local path
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch `url` into `destination`, returning the number of bytes written
    async fn fetch(&self, url: &str, destination: &Path) -> SonicResult<u64>;

    /// Get the fetcher name
    fn name(&self) -> &'static str;
}

/// HTTP(S) fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout_secs`
    pub fn new(timeout_secs: u64) -> SonicResult<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SonicError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn stream_to(&self, response: &mut reqwest::Response, partial: &Path) -> SonicResult<u64> {
        let mut file = tokio::fs::File::create(partial).await.map_err(|e| {
            SonicError::load_failed(format!("Failed to create {}: {}", partial.display(), e))
        })?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SonicError::load_failed(format!("Download interrupted: {}", e)))?
        {
            file.write_all(&chunk).await.map_err(|e| {
                SonicError::load_failed(format!("Failed to write {}: {}", partial.display(), e))
            })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| {
            SonicError::load_failed(format!("Failed to flush {}: {}", partial.display(), e))
        })?;

        Ok(written)
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> SonicResult<u64> {
        info!(
            url = url,
            destination = %destination.display(),
            "Fetching model artifact"
        );

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SonicError::load_failed(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SonicError::load_failed(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = url, status = %status, "Artifact fetch rejected");
            return Err(SonicError::load_failed(format!(
                "Failed to fetch {}: HTTP {}",
                url, status
            )));
        }

        let partial = partial_path(destination);
        let written = match self.stream_to(&mut response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, destination).await.map_err(|e| {
            SonicError::load_failed(format!(
                "Failed to move download into {}: {}",
                destination.display(),
                e
            ))
        })?;

        debug!(url = url, bytes = written, "Artifact fetch complete");
        Ok(written)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// `model.bin` -> `model.bin.part`
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
