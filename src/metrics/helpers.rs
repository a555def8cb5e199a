//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::proxy::StatusClass;

use super::{
    BATCH_DURATION, BATCH_ROWS_TOTAL, BATCH_RUNS_ACTIVE, BATCH_RUNS_TOTAL, PROXY_LATENCY,
    PROXY_REQUESTS_TOTAL, TEMPLATE_VALIDATIONS_TOTAL, WORKSPACES_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording proxy metrics
pub struct ProxyMetrics;

impl ProxyMetrics {
    /// Record one forwarded request and its latency
    pub fn record(status: u16, elapsed: Duration) {
        let outcome = StatusClass::of(status).as_str();
        PROXY_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
        PROXY_LATENCY
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for recording batch metrics
pub struct BatchMetrics;

impl BatchMetrics {
    pub fn record_run_started() {
        BATCH_RUNS_TOTAL.inc();
        BATCH_RUNS_ACTIVE.inc();
    }

    pub fn record_run_finished(elapsed: Duration) {
        BATCH_RUNS_ACTIVE.dec();
        BATCH_DURATION.observe(elapsed.as_secs_f64());
    }

    pub fn record_row(status: u16) {
        BATCH_ROWS_TOTAL
            .with_label_values(&[StatusClass::of(status).as_str()])
            .inc();
    }

    pub fn record_row_cancelled() {
        BATCH_ROWS_TOTAL.with_label_values(&["cancelled"]).inc();
    }
}

/// Helper struct for recording template metrics
pub struct TemplateMetrics;

impl TemplateMetrics {
    pub fn record_validation(is_valid: bool) {
        let result = if is_valid { "valid" } else { "invalid" };
        TEMPLATE_VALIDATIONS_TOTAL.with_label_values(&[result]).inc();
    }
}

/// Helper struct for workspace metrics
pub struct WorkspaceMetrics;

impl WorkspaceMetrics {
    pub fn set_open(count: usize) {
        WORKSPACES_TOTAL.set(count as i64);
    }
}
