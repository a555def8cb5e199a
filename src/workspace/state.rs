//! Workspace state and its pure reducer

use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::batch::AliasField;
use crate::fields::{list_fields, template_fields};
use crate::proxy::{HttpMethod, ProxyInvoke, ProxyRequest, ProxyResponse, StatusClass};
use crate::template::{
    detect_placeholders, format, resolve, validate, PlaceholderMeta, TemplateInput,
    ValidationReport, ValueMap,
};

pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_METHOD: HttpMethod = HttpMethod::Post;
pub const DEFAULT_BODY: &str = r#"{
  "userId": "{{user_id}}",
  "title": "{{post_title}}",
  "body": "{{post_content}}"
}"#;

/// Outcome of the last single send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: u16,
    pub duration_ms: u64,
    pub response: Value,
}

impl ApiResponse {
    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }
}

/// Everything the request editor shows. Derived fields (placeholders,
/// validation, available fields) are recomputed by [`reduce`] whenever their
/// source changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    pub id: Uuid,
    pub name: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub headers: IndexMap<String, String>,
    pub body: String,
    pub response: Option<ApiResponse>,

    pub placeholders: Vec<PlaceholderMeta>,
    pub placeholder_values: ValueMap,
    pub validation: ValidationReport,

    pub available_request_fields: Vec<String>,
    pub available_response_fields: Vec<String>,
    pub selected_request_fields: Vec<AliasField>,
    pub selected_response_fields: Vec<AliasField>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceState {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        let state = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            method: DEFAULT_METHOD,
            headers: IndexMap::new(),
            body: DEFAULT_BODY.to_string(),
            response: None,
            placeholders: Vec::new(),
            placeholder_values: ValueMap::new(),
            validation: ValidationReport::default(),
            available_request_fields: Vec::new(),
            available_response_fields: Vec::new(),
            selected_request_fields: Vec::new(),
            selected_response_fields: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.with_body_derived()
    }

    /// Names of the placeholders in the current body, in order
    pub fn placeholder_names(&self) -> Vec<String> {
        self.placeholders.iter().map(|p| p.name.clone()).collect()
    }

    /// The request a single send would issue
    pub fn request(&self) -> ProxyRequest {
        let mut request = ProxyRequest::new(self.endpoint.clone(), self.method)
            .headers(self.headers.clone());
        if self.method.allows_body() {
            let template = TemplateInput::parse(&self.body);
            request.body = Some(resolve(&template, &self.placeholder_values));
        }
        request
    }

    fn with_body_derived(mut self) -> Self {
        self.placeholders = detect_placeholders(&self.body);
        // Values only live as long as their placeholder does
        let names = self.placeholder_names();
        self.placeholder_values = std::mem::take(&mut self.placeholder_values)
            .into_iter()
            .filter(|(name, _)| names.contains(name))
            .collect();
        self.validation = validate(&self.body);
        self.available_request_fields = template_fields(&self.body);
        self
    }
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Edits applied to a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkspaceAction {
    SetName { name: String },
    SetEndpoint { endpoint: String },
    SetMethod { method: HttpMethod },
    SetHeaders { headers: IndexMap<String, String> },
    SetBody { body: String },
    FormatBody,
    SetPlaceholderValue { name: String, value: Value },
    ClearPlaceholderValues,
    SetResponse { response: Option<ApiResponse> },
    ToggleRequestField { path: String },
    ToggleResponseField { path: String },
    SetRequestAlias { path: String, alias: String },
    SetResponseAlias { path: String, alias: String },
}

/// Apply one action. Pure: the same state and action always give the same
/// result, and timestamps are left to the caller.
pub fn reduce(state: WorkspaceState, action: WorkspaceAction) -> WorkspaceState {
    let mut next = state;
    match action {
        WorkspaceAction::SetName { name } => next.name = name,
        WorkspaceAction::SetEndpoint { endpoint } => next.endpoint = endpoint,
        WorkspaceAction::SetMethod { method } => next.method = method,
        WorkspaceAction::SetHeaders { headers } => next.headers = headers,
        WorkspaceAction::SetBody { body } => {
            next.body = body;
            next = next.with_body_derived();
        }
        WorkspaceAction::FormatBody => {
            next.body = format(&next.body);
            next = next.with_body_derived();
        }
        WorkspaceAction::SetPlaceholderValue { name, value } => {
            next.placeholder_values.insert(name, value);
        }
        WorkspaceAction::ClearPlaceholderValues => next.placeholder_values.clear(),
        WorkspaceAction::SetResponse { response } => {
            next.available_response_fields = response
                .as_ref()
                .map(|r| list_fields(&r.response))
                .unwrap_or_default();
            next.response = response;
        }
        WorkspaceAction::ToggleRequestField { path } => {
            next.selected_request_fields = toggle_field(&next.selected_request_fields, &path);
        }
        WorkspaceAction::ToggleResponseField { path } => {
            next.selected_response_fields = toggle_field(&next.selected_response_fields, &path);
        }
        WorkspaceAction::SetRequestAlias { path, alias } => {
            next.selected_request_fields = set_alias(&next.selected_request_fields, &path, &alias);
        }
        WorkspaceAction::SetResponseAlias { path, alias } => {
            next.selected_response_fields =
                set_alias(&next.selected_response_fields, &path, &alias);
        }
    }
    next
}

/// Remove the entry for `path`, or append `{path, alias: ""}` when absent
pub fn toggle_field(fields: &[AliasField], path: &str) -> Vec<AliasField> {
    if fields.iter().any(|f| f.path == path) {
        fields.iter().filter(|f| f.path != path).cloned().collect()
    } else {
        let mut next = fields.to_vec();
        next.push(AliasField::new(path));
        next
    }
}

/// Set the alias of the entry for `path`; unknown paths are ignored
pub fn set_alias(fields: &[AliasField], path: &str, alias: &str) -> Vec<AliasField> {
    fields
        .iter()
        .map(|f| {
            if f.path == path {
                AliasField::with_alias(path, alias)
            } else {
                f.clone()
            }
        })
        .collect()
}

/// Resolve the workspace body, call the proxy and time the call
#[tracing::instrument(skip_all, fields(workspace.id = %state.id, http.method = %state.method))]
pub async fn send<P>(state: &WorkspaceState, proxy: &P) -> ApiResponse
where
    P: ProxyInvoke + ?Sized,
{
    let request = state.request();
    let started = Instant::now();
    let ProxyResponse { status, response } = proxy.invoke(request).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    tracing::info!(status, duration_ms, "Workspace request sent");

    ApiResponse {
        status,
        duration_ms,
        response,
    }
}
