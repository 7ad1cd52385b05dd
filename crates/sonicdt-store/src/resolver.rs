//! Model store resolver
//!
//! Turns a [`ModelSource`] into a validated, non-empty local file.
//! Remote sources are only fetched when the destination is absent or
//! empty; an existing non-empty destination is a cache hit.

use sonicdt_core::{ModelConfig, ModelSource, SonicError, SonicResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::fetch::{ArtifactFetcher, HttpFetcher};

/// A local artifact that passed resolution checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Path to the artifact file
    pub path: PathBuf,
    /// Size in bytes (always non-zero)
    pub size: u64,
    /// Whether this resolution downloaded the file
    pub fetched: bool,
}

/// Resolves the configured model source to a usable local path
pub struct ModelResolver {
    source: ModelSource,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl ModelResolver {
    /// Create a resolver with an explicit fetcher
    pub fn new(source: ModelSource, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self { source, fetcher }
    }

    /// Create a resolver using the HTTP fetcher
    pub fn from_config(config: &ModelConfig) -> SonicResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout_secs)?;
        Ok(Self::new(config.source.clone(), Arc::new(fetcher)))
    }

    /// Get the configured source
    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Ensure a non-empty local copy of the artifact exists
    pub async fn resolve(&self) -> SonicResult<ResolvedArtifact> {
        match &self.source {
            ModelSource::Local { path } => {
                match tokio::fs::metadata(path).await {
                    Ok(_) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(SonicError::ArtifactNotFound(path.clone()));
                    }
                    Err(e) => {
                        return Err(SonicError::load_failed(format!(
                            "Failed to stat {}: {}",
                            path.display(),
                            e
                        )));
                    }
                }
                let size = verify_non_empty(path).await?;
                debug!(path = %path.display(), size = size, "Resolved local artifact");
                Ok(ResolvedArtifact {
                    path: path.clone(),
                    size,
                    fetched: false,
                })
            }
            ModelSource::Remote { url, destination } => {
                if let Some(size) = non_empty_size(destination).await {
                    info!(
                        destination = %destination.display(),
                        size = size,
                        "Artifact already present, skipping download"
                    );
                    return Ok(ResolvedArtifact {
                        path: destination.clone(),
                        size,
                        fetched: false,
                    });
                }

                self.fetcher.fetch(url, destination).await?;
                let size = verify_non_empty(destination).await?;
                info!(
                    url = %url,
                    destination = %destination.display(),
                    size = size,
                    fetcher = self.fetcher.name(),
                    "Downloaded model artifact"
                );
                Ok(ResolvedArtifact {
                    path: destination.clone(),
                    size,
                    fetched: true,
                })
            }
        }
    }
}

/// Size of `path` if it is a regular, non-empty file
async fn non_empty_size(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

async fn verify_non_empty(path: &Path) -> SonicResult<u64> {
    non_empty_size(path)
        .await
        .ok_or_else(|| SonicError::ArtifactCorruptOrMissing(path.to_path_buf()))
}
