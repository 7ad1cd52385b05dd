//! CLI commands implementation

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sonicdt_core::{FeatureVector, ModelConfig, ModelSource, DEFAULT_MODEL_FILE};
use sonicdt_runtime::ModelGateway;
use std::path::PathBuf;
use uuid::Uuid;

/// API client for communicating with the daemon
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Prediction response from API
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub id: Uuid,
    pub features: FeatureVector,
    #[allow(dead_code)]
    pub dt: f64,
    pub display: String,
    pub predicted_at: DateTime<Utc>,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status response
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub state: String,
    pub source: String,
    pub model: Option<String>,
    pub format: Option<String>,
    pub attempts: Vec<String>,
    pub artifact_size: Option<u64>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Pull the error message out of a failed API response
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => body.error,
        Err(_) if text.is_empty() => status.to_string(),
        Err(_) => text,
    }
}

/// Request a prediction from the daemon
pub async fn predict(client: &ApiClient, features: FeatureVector) -> Result<()> {
    #[derive(Serialize)]
    struct PredictRequest {
        rhob: f64,
        gr: f64,
        nphi: f64,
        pef: f64,
    }

    let req = PredictRequest {
        rhob: features.rhob,
        gr: features.gr,
        nphi: features.nphi,
        pef: features.pef,
    };

    let response = client
        .client
        .post(client.url("/api/v1/predict"))
        .json(&req)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", client.base_url))?;

    if !response.status().is_success() {
        anyhow::bail!("{}", error_message(response).await);
    }

    let prediction: PredictResponse = response.json().await?;
    let f = prediction.features;
    println!("Predicted DT: {}", prediction.display);
    println!("  RHOB: {}  GR: {}  NPHI: {}  PEF: {}", f.rhob, f.gr, f.nphi, f.pef);
    println!("  ID: {}", prediction.id);
    println!("  At: {}", prediction.predicted_at);

    Ok(())
}

/// Show daemon and model status
pub async fn status(client: &ApiClient) -> Result<()> {
    let response = client
        .client
        .get(client.url("/api/v1/status"))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", client.base_url))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", error_message(response).await);
    }

    let status: StatusResponse = response.json().await?;

    println!("sonicdt v{}", status.version);
    println!();
    println!("Model state: {}", status.state);
    println!("Source: {}", status.source);
    if let Some(model) = status.model {
        println!("Model: {}", model);
    }
    if let Some(format) = status.format {
        println!("Format: {} (tried: {})", format, status.attempts.join(", "));
    }
    if let Some(size) = status.artifact_size {
        println!("Artifact size: {} bytes", size);
    }
    if let Some(loaded_at) = status.loaded_at {
        println!("Loaded at: {}", loaded_at);
    }
    if let Some(error) = status.error {
        println!("Error: {}", error);
    }

    Ok(())
}

/// Build the artifact source for `check` from its flags
pub fn check_source(
    model_path: Option<PathBuf>,
    model_url: Option<String>,
    destination: Option<PathBuf>,
) -> ModelSource {
    match (model_url, destination) {
        (Some(url), Some(destination)) => ModelSource::Remote { url, destination },
        _ => ModelSource::Local {
            path: model_path.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_FILE)),
        },
    }
}

/// Load an artifact in-process and run one prediction against it
pub async fn check(source: ModelSource, timeout_secs: u64, features: FeatureVector) -> Result<()> {
    source.validate()?;
    let gateway = ModelGateway::from_config(&ModelConfig {
        source,
        fetch_timeout_secs: timeout_secs,
    })?;

    let loaded = gateway.load().await?;
    println!("Source: {}", gateway.source());
    println!("Model: {}", loaded.describe());
    println!(
        "Format: {} (tried: {})",
        loaded.format,
        loaded.attempts.join(", ")
    );
    println!(
        "Artifact: {} ({} bytes{})",
        loaded.path.display(),
        loaded.size,
        if loaded.fetched { ", downloaded" } else { "" }
    );

    let prediction = gateway.predict(&features)?;
    println!("Predicted DT: {}", prediction.display_value());

    Ok(())
}
