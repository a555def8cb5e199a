//! Template engine endpoints. All of them are pure functions of the request.

use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::fields::{list_fields, template_fields};
use crate::metrics::TemplateMetrics;
use crate::template::{
    detect_placeholders, format, highlights, markers, render_payload, resolve, EditorMarker,
    MissingValuePolicy, PlaceholderMeta, TemplateInput, TokenHighlight, ValidationError, ValueMap,
};

#[derive(Debug, Deserialize)]
pub struct TemplateTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub markers: Vec<EditorMarker>,
}

#[derive(Debug, Serialize)]
pub struct FormatResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceholdersResponse {
    pub placeholders: Vec<PlaceholderMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteRequest {
    pub text: String,
    #[serde(default)]
    pub values: ValueMap,
    /// When set, resolve the way batch rows are resolved: raw-text
    /// substitution with unresolved tokens handled by this policy
    pub missing_values: Option<MissingValuePolicy>,
}

#[derive(Debug, Serialize)]
pub struct SubstituteResponse {
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct FieldsRequest {
    /// Template text, parsed leniently
    pub text: Option<String>,
    /// An already-parsed value, e.g. a response body
    pub value: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub fields: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HighlightsResponse {
    pub highlights: Vec<TokenHighlight>,
}

/// POST /api/v1/template/validate
#[tracing::instrument(name = "http.validate_template", skip_all)]
pub async fn validate_template(Json(request): Json<TemplateTextRequest>) -> Json<ValidateResponse> {
    let report = crate::template::validate(&request.text);
    TemplateMetrics::record_validation(report.is_valid);
    let markers = markers(&report);

    Json(ValidateResponse {
        is_valid: report.is_valid,
        errors: report.errors,
        markers,
    })
}

/// POST /api/v1/template/format
#[tracing::instrument(name = "http.format_template", skip_all)]
pub async fn format_template(Json(request): Json<TemplateTextRequest>) -> Json<FormatResponse> {
    Json(FormatResponse {
        text: format(&request.text),
    })
}

/// POST /api/v1/template/placeholders
#[tracing::instrument(name = "http.template_placeholders", skip_all)]
pub async fn template_placeholders(
    Json(request): Json<TemplateTextRequest>,
) -> Json<PlaceholdersResponse> {
    Json(PlaceholdersResponse {
        placeholders: detect_placeholders(&request.text),
    })
}

/// POST /api/v1/template/substitute
#[tracing::instrument(name = "http.substitute_template", skip_all)]
pub async fn substitute_template(
    Json(request): Json<SubstituteRequest>,
) -> Result<Json<SubstituteResponse>> {
    let payload = match request.missing_values {
        Some(policy) => render_payload(&request.text, &request.values, policy)?,
        None => resolve(&TemplateInput::parse(&request.text), &request.values),
    };
    Ok(Json(SubstituteResponse { payload }))
}

/// POST /api/v1/template/fields
#[tracing::instrument(name = "http.template_fields", skip_all)]
pub async fn template_field_paths(Json(request): Json<FieldsRequest>) -> Json<FieldsResponse> {
    let fields = match (request.value, request.text) {
        (Some(value), _) => list_fields(&value),
        (None, Some(text)) => template_fields(&text),
        (None, None) => Vec::new(),
    };
    Json(FieldsResponse { fields })
}

/// POST /api/v1/template/highlights
#[tracing::instrument(name = "http.template_highlights", skip_all)]
pub async fn template_highlights(
    Json(request): Json<TemplateTextRequest>,
) -> Json<HighlightsResponse> {
    Json(HighlightsResponse {
        highlights: highlights(&request.text),
    })
}
