//! Batch execution of a request template over CSV rows.
//!
//! This module provides:
//! - CSV import into ordered rows and CSV template generation
//! - Per-row cell coercion and column-to-token matching
//! - A bounded worker pool with generation-based supersession
//! - Report projection and CSV export of results

mod executor;
mod report;
mod resolve;
mod source;
mod types;

pub use executor::{run, run_all, BatchGeneration, BatchRegistry, BatchTicket};
pub use report::{
    export_csv, paired_placeholder_names, report_header, report_rows, summarize,
    visible_request_fields, visible_response_fields, ReportSource,
};
pub use resolve::{build_value_map, coerce_cell, coerce_row, normalize_key, resolve_row};
pub use source::{csv_template, import, parse_rows, CsvError, CsvImport};
pub use types::{
    AliasField, BatchJob, BatchProgress, BatchResult, BatchRow, BatchSummary, ExecutionMode,
    ExecutionPolicy, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, TITLE_COLUMN,
};
