//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::batch::ExecutionMode;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub workspaces: usize,
    pub batch: BatchHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct BatchHealthResponse {
    pub mode: ExecutionMode,
    pub concurrency: usize,
    pub max_rows: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let policy = state.settings.batch.policy();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        workspaces: state.workspaces.count(),
        batch: BatchHealthResponse {
            mode: policy.mode,
            concurrency: policy.concurrency,
            max_rows: state.settings.batch.max_rows,
        },
    })
}
