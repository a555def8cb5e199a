//! Batch data types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proxy::{HttpMethod, ProxyResponse, StatusClass};
use crate::template::MissingValuePolicy;

/// Reserved column used only to label rows in reports
pub const TITLE_COLUMN: &str = "[title]";

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const MAX_CONCURRENCY: usize = 10;

/// One CSV record: column name to raw cell text, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchRow(pub IndexMap<String, String>);

impl BatchRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: impl Into<String>) {
        self.0.insert(column.into(), cell.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display label: the `[title]` cell when present, else `Row N` (1-based)
    pub fn label(&self, index: usize) -> String {
        match self.get(TITLE_COLUMN).map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Row {}", index + 1),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BatchRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A selected field with an optional display alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasField {
    pub path: String,
    #[serde(default)]
    pub alias: String,
}

impl AliasField {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: String::new(),
        }
    }

    pub fn with_alias(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
        }
    }

    /// Column header: the alias when set, else the path
    pub fn label(&self) -> &str {
        if self.alias.is_empty() {
            &self.path
        } else {
            &self.alias
        }
    }
}

/// Outcome of one row. Always present, one per input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Position of the row in the input
    pub index: usize,
    pub label: String,
    pub row: BatchRow,
    /// Upstream status, `0` for transport or client-side failures
    pub status: u16,
    pub duration_ms: u64,
    pub response: Value,
    /// Resolved request body, absent when the row failed before sending
    pub payload: Option<Value>,
}

impl BatchResult {
    pub fn from_response(
        index: usize,
        row: BatchRow,
        payload: Value,
        response: ProxyResponse,
        duration_ms: u64,
    ) -> Self {
        Self {
            index,
            label: row.label(index),
            row,
            status: response.status,
            duration_ms,
            response: response.response,
            payload: Some(payload),
        }
    }

    pub fn failed(index: usize, row: BatchRow, message: impl Into<String>) -> Self {
        let failure = ProxyResponse::transport_error(message);
        Self {
            index,
            label: row.label(index),
            row,
            status: failure.status,
            duration_ms: 0,
            response: failure.response,
            payload: None,
        }
    }

    pub fn cancelled(index: usize, row: BatchRow) -> Self {
        Self::failed(index, row, CANCELLED_MESSAGE)
    }

    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }

    pub fn is_success(&self) -> bool {
        self.class() == StatusClass::Success
    }
}

pub(crate) const CANCELLED_MESSAGE: &str = "batch cancelled";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One row at a time, in order
    Sequential,
    /// Bounded worker pool sharing a row cursor
    #[default]
    Concurrent,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            other => Err(format!("unknown execution mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPolicy {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pause between consecutive rows of one worker
    #[serde(default)]
    pub pacing_ms: u64,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl ExecutionPolicy {
    pub fn sequential() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            ..Self::default()
        }
    }

    pub fn concurrent(concurrency: usize) -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            concurrency,
            pacing_ms: 0,
        }
    }

    pub fn with_pacing(mut self, pacing_ms: u64) -> Self {
        self.pacing_ms = pacing_ms;
        self
    }

    /// Number of workers to start for `rows` rows
    pub fn workers(&self, rows: usize) -> usize {
        let limit = match self.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Concurrent => self.concurrency.clamp(1, MAX_CONCURRENCY),
        };
        limit.min(rows)
    }
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self::concurrent(DEFAULT_CONCURRENCY)
    }
}

/// Everything needed to turn a row into a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Body template text
    pub template: String,
    /// Selected request fields; their aliases help match columns to tokens
    #[serde(default)]
    pub request_fields: Vec<AliasField>,
    #[serde(default = "default_true")]
    pub coerce_loose_types: bool,
    #[serde(default)]
    pub missing_values: MissingValuePolicy,
}

fn default_true() -> bool {
    true
}

impl BatchJob {
    pub fn new(endpoint: impl Into<String>, method: HttpMethod, template: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            headers: IndexMap::new(),
            template: template.into(),
            request_fields: Vec::new(),
            coerce_loose_types: true,
            missing_values: MissingValuePolicy::default(),
        }
    }

    pub fn request_fields(mut self, fields: Vec<AliasField>) -> Self {
        self.request_fields = fields;
        self
    }

    pub fn coerce_loose_types(mut self, enabled: bool) -> Self {
        self.coerce_loose_types = enabled;
        self
    }

    pub fn missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = policy;
        self
    }
}

/// Rows finished so far; `done` never decreases within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
}

/// Counts by status class
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub http_errors: usize,
    pub transport_errors: usize,
    pub avg_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_label() {
        let row: BatchRow = [("[title]", " First "), ("a", "1")].into_iter().collect();
        assert_eq!(row.label(0), "First");

        let row: BatchRow = [("[title]", ""), ("a", "1")].into_iter().collect();
        assert_eq!(row.label(4), "Row 5");
    }

    #[test]
    fn test_alias_label() {
        assert_eq!(AliasField::new("user.id").label(), "user.id");
        assert_eq!(AliasField::with_alias("user.id", "User").label(), "User");
        let field: AliasField = serde_json::from_str(r#"{"path": "x"}"#).unwrap();
        assert_eq!(field.alias, "");
    }

    #[test]
    fn test_policy_workers() {
        assert_eq!(ExecutionPolicy::default().workers(10), 3);
        assert_eq!(ExecutionPolicy::concurrent(50).workers(100), 10);
        assert_eq!(ExecutionPolicy::concurrent(0).workers(100), 1);
        assert_eq!(ExecutionPolicy::concurrent(5).workers(2), 2);
        assert_eq!(ExecutionPolicy::sequential().workers(7), 1);
        assert_eq!(ExecutionPolicy::default().workers(0), 0);
    }

    #[test]
    fn test_cancelled_result() {
        let result = BatchResult::cancelled(2, BatchRow::new());
        assert_eq!(result.status, 0);
        assert_eq!(result.response["error"], "batch cancelled");
        assert_eq!(result.label, "Row 3");
        assert!(result.payload.is_none());
    }
}
