//! Template types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("missing value for variable: {0}")]
    MissingValue(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Mapping from token name to the value substituted for it
pub type ValueMap = serde_json::Map<String, serde_json::Value>;

/// A request body template: parsed JSON when the text is valid JSON, the raw
/// text otherwise (bare tokens make most templates unparseable).
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateInput {
    Structured(serde_json::Value),
    Raw(String),
}

impl TemplateInput {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => TemplateInput::Structured(value),
            Err(_) => TemplateInput::Raw(text.to_string()),
        }
    }
}

/// User-facing descriptor of a distinct token name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderMeta {
    pub name: String,

    /// Field path where the token was first seen, or the name itself when the
    /// template was scanned as raw text
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

impl PlaceholderMeta {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description: None,
            example: None,
        }
    }
}

/// One problem found in template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
}

/// Outcome of validating template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::from_errors(Vec::new())
    }
}

/// What to do with tokens that have no value when building a request payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Quoted tokens become `""`, bare tokens become `null`
    #[default]
    Null,
    /// Fail the payload with [`TemplateError::MissingValue`]
    Reject,
}

impl std::str::FromStr for MissingValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(MissingValuePolicy::Null),
            "reject" => Ok(MissingValuePolicy::Reject),
            other => Err(format!("unknown missing value policy: {}", other)),
        }
    }
}
