//! HTTP handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sonicdt_core::{FeatureVector, ModelState, Prediction, SonicError};
use sonicdt_runtime::ModelGateway;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::page::{render_form, render_halted, Outcome};

/// Application state shared across handlers
pub struct AppState {
    pub gateway: Arc<ModelGateway>,
}

/// Create the HTTP router
pub fn create_router(gateway: Arc<ModelGateway>) -> Router {
    let state = Arc::new(AppState { gateway });

    Router::new()
        .route("/", get(index))
        .route("/predict", post(submit_form))
        .route("/health", get(health))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error returned by the JSON API
#[derive(Debug)]
pub struct ApiError(SonicError);

impl From<SonicError> for ApiError {
    fn from(err: SonicError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    timestamp: DateTime<Utc>,
}

fn status_for(err: &SonicError) -> StatusCode {
    match err {
        SonicError::ModelNotLoaded
        | SonicError::ArtifactNotFound(_)
        | SonicError::ArtifactCorruptOrMissing(_)
        | SonicError::LoadFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SonicError::Prediction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SonicError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SonicError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            timestamp: Utc::now(),
        });
        (status_for(&self.0), body).into_response()
    }
}

/// Message explaining why predictions are unavailable
fn halt_message(gateway: &ModelGateway) -> String {
    match gateway.load_error() {
        Some(err) => err.to_string(),
        None => match gateway.state() {
            ModelState::Loading => "Model is still loading".to_string(),
            _ => SonicError::ModelNotLoaded.to_string(),
        },
    }
}

/// Model description shown on the form
fn model_label(gateway: &ModelGateway) -> String {
    gateway
        .loaded()
        .map(|m| m.describe())
        .unwrap_or_else(|| "machine learning".to_string())
}

/// Render the prediction form, or the halt page if no model is available
async fn index(State(state): State<Arc<AppState>>) -> Response {
    if state.gateway.loaded().is_none() {
        let message = halt_message(&state.gateway);
        return (StatusCode::SERVICE_UNAVAILABLE, Html(render_halted(&message))).into_response();
    }

    Html(render_form(
        &FeatureVector::default(),
        &model_label(&state.gateway),
        None,
    ))
    .into_response()
}

/// Form fields as submitted by the browser
#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub rhob: f64,
    pub gr: f64,
    pub nphi: f64,
    pub pef: f64,
}

impl From<PredictForm> for FeatureVector {
    fn from(form: PredictForm) -> Self {
        FeatureVector::new(form.rhob, form.gr, form.nphi, form.pef)
    }
}

/// Handle a form submission and re-render the page with the outcome
async fn submit_form(State(state): State<Arc<AppState>>, Form(form): Form<PredictForm>) -> Response {
    let features = FeatureVector::from(form);
    let label = model_label(&state.gateway);

    match state.gateway.predict(&features) {
        Ok(prediction) => {
            info!(id = %prediction.id, dt = prediction.dt, "Form prediction");
            Html(render_form(&features, &label, Some(Outcome::Success(&prediction)))).into_response()
        }
        Err(err) if err == SonicError::ModelNotLoaded => {
            let message = halt_message(&state.gateway);
            (StatusCode::SERVICE_UNAVAILABLE, Html(render_halted(&message))).into_response()
        }
        Err(err) => {
            warn!(error = %err, "Form prediction failed");
            (
                status_for(&err),
                Html(render_form(&features, &label, Some(Outcome::Failure(&err)))),
            )
                .into_response()
        }
    }
}

/// JSON prediction request
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub rhob: f64,
    pub gr: f64,
    pub nphi: f64,
    pub pef: f64,
}

/// JSON prediction response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub id: Uuid,
    pub features: FeatureVector,
    pub dt: f64,
    pub display: String,
    pub predicted_at: DateTime<Utc>,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            display: prediction.display_value(),
            id: prediction.id,
            features: prediction.features,
            dt: prediction.dt,
            predicted_at: prediction.predicted_at,
        }
    }
}

/// Predict DT from a JSON body
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let features = FeatureVector::new(req.rhob, req.gr, req.nphi, req.pef);
    let prediction = state.gateway.predict(&features).map_err(|e| {
        if !matches!(e, SonicError::ModelNotLoaded) {
            warn!(error = %e, "API prediction failed");
        }
        e
    })?;
    info!(id = %prediction.id, dt = prediction.dt, "API prediction");
    Ok(Json(PredictResponse::from(prediction)))
}

/// Service status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub state: ModelState,
    pub source: String,
    pub model: Option<String>,
    pub format: Option<String>,
    pub attempts: Vec<String>,
    pub artifact_size: Option<u64>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Get service status
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let gateway = &state.gateway;
    let loaded = gateway.loaded();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        state: gateway.state(),
        source: gateway.source().to_string(),
        model: loaded.map(|m| m.describe()),
        format: loaded.map(|m| m.format.to_string()),
        attempts: loaded
            .map(|m| m.attempts.iter().map(|a| a.to_string()).collect())
            .unwrap_or_default(),
        artifact_size: loaded.map(|m| m.size),
        loaded_at: loaded.map(|m| m.loaded_at),
        error: gateway.load_error().map(|e| e.to_string()),
    })
}

/// Liveness plus model readiness
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.gateway.state() {
        ModelState::Loaded => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "model unavailable"),
    }
}
