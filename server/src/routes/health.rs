//! Health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use cropguard::backend::backend_name;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub model_loaded: bool,
    pub classes_count: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_status: String,
    pub classes_loaded: usize,
    pub backend: String,
    pub checkpoint_path: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// GET / - Liveness banner
pub async fn root(State(state): State<SharedState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "CropGuard API is running".to_string(),
        status: "healthy".to_string(),
        // The server never binds without a model
        model_loaded: true,
        classes_count: state.classifier.vocabulary().len(),
    })
}

/// GET /health - Detailed health check
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_status: "loaded".to_string(),
        classes_loaded: state.classifier.vocabulary().len(),
        backend: backend_name().to_string(),
        checkpoint_path: state.checkpoint_path.display().to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
