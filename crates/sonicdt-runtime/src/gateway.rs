//! Model loader and inference gateway
//!
//! The gateway resolves, reads and decodes the artifact once, then serves
//! every prediction from the cached model. The load outcome, success or
//! failure, is stored in a `OnceCell`; concurrent first callers wait on the
//! same initialization, so there is at most one fetch and one decode
//! sequence per gateway. A failed load stays failed until `invalidate`.

use chrono::{DateTime, Utc};
use sonicdt_core::{
    FeatureVector, InputFrame, ModelConfig, ModelSource, ModelState, Prediction, SonicError,
    SonicResult,
};
use sonicdt_store::ModelResolver;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::format::DecoderChain;
use crate::traits::Predictor;

/// A successfully loaded model and how it was obtained
pub struct LoadedModel {
    model: Arc<dyn Predictor>,
    /// Local artifact path
    pub path: PathBuf,
    /// Artifact size in bytes
    pub size: u64,
    /// Whether the artifact was downloaded during this load
    pub fetched: bool,
    /// Format that decoded the artifact
    pub format: &'static str,
    /// Formats tried, in order
    pub attempts: Vec<&'static str>,
    /// When loading finished
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn model(&self) -> &Arc<dyn Predictor> {
        &self.model
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }

    /// Whether a secondary format had to be used
    pub fn used_fallback(&self) -> bool {
        self.attempts.len() > 1
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model.describe())
            .field("path", &self.path)
            .field("size", &self.size)
            .field("fetched", &self.fetched)
            .field("format", &self.format)
            .field("attempts", &self.attempts)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Resets the loading flag even if the load future is dropped
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Process-wide entry point for loading the model and running predictions
pub struct ModelGateway {
    resolver: ModelResolver,
    decoders: DecoderChain,
    outcome: OnceCell<SonicResult<LoadedModel>>,
    loading: AtomicBool,
}

impl ModelGateway {
    pub fn new(resolver: ModelResolver, decoders: DecoderChain) -> Self {
        Self {
            resolver,
            decoders,
            outcome: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// Gateway with the HTTP fetcher and the standard decoder chain
    pub fn from_config(config: &ModelConfig) -> SonicResult<Self> {
        Ok(Self::new(
            ModelResolver::from_config(config)?,
            DecoderChain::standard(),
        ))
    }

    pub fn source(&self) -> &ModelSource {
        self.resolver.source()
    }

    /// Load the model on first call; later calls return the cached outcome
    pub async fn load(&self) -> SonicResult<&LoadedModel> {
        let outcome = self
            .outcome
            .get_or_init(|| async {
                let _guard = LoadingGuard::new(&self.loading);
                let result = self.load_uncached().await;
                if let Err(e) = &result {
                    error!(source = %self.source(), error = %e, "Model load failed");
                }
                result
            })
            .await;

        outcome.as_ref().map_err(Clone::clone)
    }

    async fn load_uncached(&self) -> SonicResult<LoadedModel> {
        let started = Instant::now();
        info!(
            source = %self.source(),
            formats = ?self.decoders.formats(),
            "Loading model"
        );

        let resolved = self.resolver.resolve().await?;

        let bytes = tokio::fs::read(&resolved.path).await.map_err(|e| {
            SonicError::load_failed(format!("Failed to read {}: {}", resolved.path.display(), e))
        })?;

        let decoded = self
            .decoders
            .decode(&bytes)
            .map_err(|e| SonicError::load_failed(e.to_string()))?;

        let loaded = LoadedModel {
            model: decoded.model,
            path: resolved.path,
            size: resolved.size,
            fetched: resolved.fetched,
            format: decoded.format,
            attempts: decoded.attempts,
            loaded_at: Utc::now(),
        };

        info!(
            path = %loaded.path.display(),
            format = loaded.format,
            fallback = loaded.used_fallback(),
            model = %loaded.describe(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model loaded"
        );

        Ok(loaded)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModelState {
        match self.outcome.get() {
            Some(Ok(_)) => ModelState::Loaded,
            Some(Err(_)) => ModelState::Failed,
            None if self.loading.load(Ordering::SeqCst) => ModelState::Loading,
            None => ModelState::Unloaded,
        }
    }

    /// The cached model, if loaded
    pub fn loaded(&self) -> Option<&LoadedModel> {
        self.outcome.get().and_then(|o| o.as_ref().ok())
    }

    /// The cached load failure, if any
    pub fn load_error(&self) -> Option<&SonicError> {
        self.outcome.get().and_then(|o| o.as_ref().err())
    }

    /// Forget the cached outcome so the next `load` starts over
    pub fn invalidate(&mut self) {
        if self.outcome.take().is_some() {
            info!(source = %self.source(), "Model cache invalidated");
        }
    }

    /// Predict DT for one feature vector using the cached model
    pub fn predict(&self, features: &FeatureVector) -> SonicResult<Prediction> {
        let loaded = self.loaded().ok_or(SonicError::ModelNotLoaded)?;
        let frame = InputFrame::single(features);

        let outputs = match catch_unwind(AssertUnwindSafe(|| loaded.model.predict(&frame))) {
            Ok(Ok(outputs)) => outputs,
            Ok(Err(e)) => {
                warn!(error = %e, "Model inference failed");
                return Err(SonicError::prediction(e.to_string()));
            }
            Err(_) => {
                error!("Model inference panicked");
                return Err(SonicError::prediction("model inference panicked"));
            }
        };

        let dt = outputs
            .first()
            .copied()
            .ok_or_else(|| SonicError::prediction("model returned no output"))?;
        if !dt.is_finite() {
            return Err(SonicError::prediction(format!(
                "model produced non-finite output {}",
                dt
            )));
        }

        let prediction = Prediction::new(*features, dt);
        debug!(id = %prediction.id, dt = dt, "Prediction complete");
        Ok(prediction)
    }
}
