//! Workspace storage with CRUD operations

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::WorkspaceMetrics;
use crate::proxy::HttpMethod;

use super::state::{reduce, ApiResponse, WorkspaceAction, WorkspaceState};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Workspace not found: {0}")]
    NotFound(Uuid),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Initial settings for a new workspace; omitted fields keep their defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: Option<IndexMap<String, String>>,
    pub body: Option<String>,
}

impl CreateWorkspaceRequest {
    fn actions(self) -> Vec<WorkspaceAction> {
        let mut actions = Vec::new();
        if let Some(endpoint) = self.endpoint {
            actions.push(WorkspaceAction::SetEndpoint { endpoint });
        }
        if let Some(method) = self.method {
            actions.push(WorkspaceAction::SetMethod { method });
        }
        if let Some(headers) = self.headers {
            actions.push(WorkspaceAction::SetHeaders { headers });
        }
        if let Some(body) = self.body {
            actions.push(WorkspaceAction::SetBody { body });
        }
        actions
    }
}

/// In-memory workspace storage
pub struct WorkspaceStore {
    workspaces: DashMap<Uuid, WorkspaceState>,
}

impl Default for WorkspaceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self {
            workspaces: DashMap::new(),
        }
    }

    /// Create a workspace from defaults plus the given overrides
    pub fn create(&self, request: CreateWorkspaceRequest) -> WorkspaceState {
        let name = request.name.clone().unwrap_or_else(|| "Untitled".to_string());
        let state = request
            .actions()
            .into_iter()
            .fold(WorkspaceState::new(name), reduce);

        self.workspaces.insert(state.id, state.clone());
        WorkspaceMetrics::set_open(self.workspaces.len());
        tracing::debug!(workspace.id = %state.id, "Workspace created");
        state
    }

    pub fn get(&self, id: Uuid) -> WorkspaceResult<WorkspaceState> {
        self.workspaces
            .get(&id)
            .map(|w| w.clone())
            .ok_or(WorkspaceError::NotFound(id))
    }

    /// All workspaces, oldest first
    pub fn list(&self) -> Vec<WorkspaceState> {
        let mut all: Vec<WorkspaceState> = self
            .workspaces
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|w| w.created_at);
        all
    }

    /// Apply actions in order and return the new state
    pub fn dispatch(
        &self,
        id: Uuid,
        actions: Vec<WorkspaceAction>,
    ) -> WorkspaceResult<WorkspaceState> {
        let mut entry = self
            .workspaces
            .get_mut(&id)
            .ok_or(WorkspaceError::NotFound(id))?;

        let current = entry.value().clone();
        let mut next = actions.into_iter().fold(current, reduce);
        next.updated_at = Utc::now();
        *entry.value_mut() = next.clone();

        Ok(next)
    }

    /// Store the outcome of a single send
    pub fn record_response(
        &self,
        id: Uuid,
        response: ApiResponse,
    ) -> WorkspaceResult<WorkspaceState> {
        self.dispatch(
            id,
            vec![WorkspaceAction::SetResponse {
                response: Some(response),
            }],
        )
    }

    pub fn delete(&self, id: Uuid) -> WorkspaceResult<()> {
        let removed = self.workspaces.remove(&id).map(|_| ());
        WorkspaceMetrics::set_open(self.workspaces.len());
        removed.ok_or(WorkspaceError::NotFound(id))
    }

    pub fn exists(&self, id: Uuid) -> bool {
        self.workspaces.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.workspaces.len()
    }
}

/// Create an Arc-wrapped workspace store
pub fn create_workspace_store() -> Arc<WorkspaceStore> {
    Arc::new(WorkspaceStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_create_and_get() {
        let store = WorkspaceStore::new();
        let created = store.create(CreateWorkspaceRequest {
            name: Some("Posts".to_string()),
            method: Some(HttpMethod::Put),
            body: Some(r#"{"id": {{post_id}}}"#.to_string()),
            ..Default::default()
        });

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.name, "Posts");
        assert_eq!(fetched.method, HttpMethod::Put);
        assert_eq!(fetched.placeholder_names(), vec!["post_id"]);
        assert!(store.exists(created.id));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_store_dispatch() {
        let store = WorkspaceStore::new();
        let id = store.create(CreateWorkspaceRequest::default()).id;

        let state = store
            .dispatch(
                id,
                vec![
                    WorkspaceAction::SetEndpoint {
                        endpoint: "http://localhost:9/x".to_string(),
                    },
                    WorkspaceAction::ToggleRequestField {
                        path: "title".to_string(),
                    },
                ],
            )
            .unwrap();
        assert_eq!(state.endpoint, "http://localhost:9/x");
        assert_eq!(state.selected_request_fields.len(), 1);
        assert!(state.updated_at >= state.created_at);

        let state = store
            .record_response(
                id,
                ApiResponse {
                    status: 200,
                    duration_ms: 5,
                    response: json!({"ok": true}),
                },
            )
            .unwrap();
        assert_eq!(state.available_response_fields, vec!["ok"]);
    }

    #[test]
    fn test_store_not_found() {
        let store = WorkspaceStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.get(id), Err(WorkspaceError::NotFound(_))));
        assert!(store.dispatch(id, vec![]).is_err());
        assert!(store.delete(id).is_err());
    }

    #[test]
    fn test_store_delete() {
        let store = WorkspaceStore::new();
        let id = store.create(CreateWorkspaceRequest::default()).id;
        assert!(store.delete(id).is_ok());
        assert!(!store.exists(id));
    }
}
