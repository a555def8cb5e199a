//! Workspace endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::server::AppState;
use crate::workspace::{self, CreateWorkspaceRequest, WorkspaceAction, WorkspaceState};

#[derive(Debug, Serialize)]
pub struct WorkspaceListResponse {
    pub workspaces: Vec<WorkspaceState>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub actions: Vec<WorkspaceAction>,
}

/// POST /api/v1/workspaces - Create a workspace
#[tracing::instrument(name = "http.create_workspace", skip_all)]
pub async fn create_workspace(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkspaceRequest>,
) -> (StatusCode, Json<WorkspaceState>) {
    (StatusCode::CREATED, Json(state.workspaces.create(request)))
}

/// GET /api/v1/workspaces - List all workspaces
#[tracing::instrument(name = "http.list_workspaces", skip(state))]
pub async fn list_workspaces(State(state): State<AppState>) -> Json<WorkspaceListResponse> {
    let workspaces = state.workspaces.list();
    let total = workspaces.len();

    Json(WorkspaceListResponse { workspaces, total })
}

/// GET /api/v1/workspaces/{id}
#[tracing::instrument(name = "http.get_workspace", skip(state))]
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceState>> {
    Ok(Json(state.workspaces.get(id)?))
}

/// DELETE /api/v1/workspaces/{id}
#[tracing::instrument(name = "http.delete_workspace", skip(state))]
pub async fn delete_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.workspaces.delete(id)?;
    state.batches.remove(&id.to_string());
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/workspaces/{id}/actions - Apply actions through the reducer
#[tracing::instrument(
    name = "http.dispatch_workspace",
    skip(state, request),
    fields(actions = request.actions.len())
)]
pub async fn dispatch_actions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<WorkspaceState>> {
    Ok(Json(state.workspaces.dispatch(id, request.actions)?))
}

/// POST /api/v1/workspaces/{id}/send - Resolve the body, call the proxy and
/// record the response
#[tracing::instrument(name = "http.send_workspace", skip(state))]
pub async fn send_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceState>> {
    let current = state.workspaces.get(id)?;
    let response = workspace::send(&current, state.proxy.as_ref()).await;
    Ok(Json(state.workspaces.record_response(id, response)?))
}
