use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Deployment stage label.
    pub stage: String,
    /// Deployed workspace name.
    pub workspace: String,
    /// Number of deployed workflows.
    pub workflow_count: usize,
    /// Whether the ComfyUI engine answered its stats probe.
    pub engine_healthy: bool,
}

/// GET /health -- returns gateway and engine health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine_healthy = state.api.health_check().await.is_ok();

    let status = if engine_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        stage: state.config.stage.clone(),
        workspace: state.workspace.name.clone(),
        workflow_count: state.workspace.len(),
        engine_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
