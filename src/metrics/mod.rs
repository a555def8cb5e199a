//! Prometheus metrics for the workbench.
//!
//! - Proxy metrics (forwarded requests by outcome, upstream latency)
//! - Batch metrics (runs, rows by outcome, run duration, in-flight runs)
//! - Template metrics (validations by result)
//! - Workspace metrics (open workspaces)

mod helpers;

pub use helpers::{encode_metrics, BatchMetrics, ProxyMetrics, TemplateMetrics, WorkspaceMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "workbench";

lazy_static! {
    // ============================================================================
    // Proxy Metrics
    // ============================================================================

    /// Forwarded requests by outcome (success, http_error, transport_error)
    pub static ref PROXY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_proxy_requests_total", METRIC_PREFIX),
        "Total requests forwarded upstream",
        &["outcome"]
    ).unwrap();

    /// Upstream round-trip latency in seconds
    pub static ref PROXY_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_proxy_latency_seconds", METRIC_PREFIX),
        "Upstream request latency in seconds",
        &["outcome"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Batch Metrics
    // ============================================================================

    /// Batch runs started
    pub static ref BATCH_RUNS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_batch_runs_total", METRIC_PREFIX),
        "Total batch runs started"
    ).unwrap();

    /// Batch runs currently executing
    pub static ref BATCH_RUNS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_batch_runs_active", METRIC_PREFIX),
        "Number of batch runs in flight"
    ).unwrap();

    /// Rows processed by outcome (success, http_error, transport_error, cancelled)
    pub static ref BATCH_ROWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_batch_rows_total", METRIC_PREFIX),
        "Total batch rows processed",
        &["outcome"]
    ).unwrap();

    /// Wall-clock duration of a whole run in seconds
    pub static ref BATCH_DURATION: Histogram = register_histogram!(
        format!("{}_batch_duration_seconds", METRIC_PREFIX),
        "Batch run duration in seconds",
        vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]
    ).unwrap();

    // ============================================================================
    // Template Metrics
    // ============================================================================

    /// Template validations by result (valid, invalid)
    pub static ref TEMPLATE_VALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_template_validations_total", METRIC_PREFIX),
        "Total template validations",
        &["result"]
    ).unwrap();

    // ============================================================================
    // Workspace Metrics
    // ============================================================================

    /// Workspaces currently held in memory
    pub static ref WORKSPACES_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_workspaces_total", METRIC_PREFIX),
        "Number of open workspaces"
    ).unwrap();
}
