//! Report projection and CSV export of batch results

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::display_at;
use crate::proxy::StatusClass;

use super::source::{write_records, CsvError};
use super::types::{AliasField, BatchResult, BatchSummary};

lazy_static! {
    /// `"key": {{name}}` pairs, where a token fills a real key
    static ref PAIRED_TOKEN_RE: Regex = Regex::new(
        r#""((?:[^"\\\n]|\\.)*)"\s*:\s*\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}"#
    )
    .unwrap();
}

/// Which side of a result a report reads from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    /// The resolved request body
    Request,
    #[default]
    Response,
}

impl ReportSource {
    fn target<'r>(&self, result: &'r BatchResult) -> Option<&'r Value> {
        match self {
            ReportSource::Request => result.payload.as_ref(),
            ReportSource::Response => Some(&result.response),
        }
    }
}

/// Column headers for a field selection
pub fn report_header(fields: &[AliasField]) -> Vec<String> {
    fields.iter().map(|f| f.label().to_string()).collect()
}

/// One display row per result: the value at each selected path, missing as ""
pub fn report_rows(
    results: &[BatchResult],
    fields: &[AliasField],
    source: ReportSource,
) -> Vec<Vec<String>> {
    results
        .iter()
        .map(|result| {
            let target = source.target(result);
            fields
                .iter()
                .map(|field| match target {
                    Some(value) => display_at(value, &field.path),
                    None => String::new(),
                })
                .collect()
        })
        .collect()
}

/// CSV export: a header of aliases (or paths), then one record per result
pub fn export_csv(
    results: &[BatchResult],
    fields: &[AliasField],
    source: ReportSource,
) -> Result<String, CsvError> {
    let header = report_header(fields);
    let rows = report_rows(results, fields, source);
    write_records(std::iter::once(header).chain(rows))
}

/// Token names that fill a real key directly, as in `"userId": {{user_id}}`
pub fn paired_placeholder_names(template: &str) -> HashSet<String> {
    PAIRED_TOKEN_RE
        .captures_iter(template)
        .map(|caps| caps[2].to_string())
        .collect()
}

/// Request-side columns worth showing: selected, still available, and not
/// just a placeholder name (those duplicate the key they fill)
pub fn visible_request_fields(
    selected: &[AliasField],
    available: &[String],
    placeholder_names: &[String],
    template: &str,
) -> Vec<AliasField> {
    let paired = paired_placeholder_names(template);
    selected
        .iter()
        .filter(|f| {
            available.contains(&f.path)
                && !placeholder_names.contains(&f.path)
                && !paired.contains(&f.path)
        })
        .cloned()
        .collect()
}

/// Response-side columns: selected and still available
pub fn visible_response_fields(selected: &[AliasField], available: &[String]) -> Vec<AliasField> {
    selected
        .iter()
        .filter(|f| available.contains(&f.path))
        .cloned()
        .collect()
}

/// Counts by status class and mean duration
pub fn summarize(results: &[BatchResult]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: results.len(),
        ..BatchSummary::default()
    };
    let mut total_ms: u64 = 0;

    for result in results {
        match result.class() {
            StatusClass::Success => summary.succeeded += 1,
            StatusClass::HttpError => summary.http_errors += 1,
            StatusClass::TransportError => summary.transport_errors += 1,
        }
        total_ms += result.duration_ms;
    }

    if !results.is_empty() {
        summary.avg_duration_ms = total_ms / results.len() as u64;
    }
    summary
}
