//! Editor-facing projections: token highlight ranges and error markers

use serde::Serialize;

use super::token::{scan_tokens, TokenContext};
use super::types::ValidationReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHighlight {
    pub name: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub context: TokenContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorMarker {
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub message: String,
}

/// Byte ranges of every well-formed token
pub fn highlights(text: &str) -> Vec<TokenHighlight> {
    scan_tokens(text)
        .into_iter()
        .map(|token| TokenHighlight {
            name: token.name,
            start_offset: token.start,
            end_offset: token.end,
            context: token.context,
        })
        .collect()
}

/// Error markers for a validation report; errors without a position are
/// pinned to the start of the document
pub fn markers(report: &ValidationReport) -> Vec<EditorMarker> {
    report
        .errors
        .iter()
        .map(|err| EditorMarker {
            line: err.line.unwrap_or(1),
            column: err.column.unwrap_or(1),
            severity: Severity::Error,
            message: err.message.clone(),
        })
        .collect()
}
