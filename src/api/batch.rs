//! Batch endpoints: CSV import, runs, templates and reports.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::batch::{
    self, csv_template, export_csv, summarize, visible_request_fields, visible_response_fields,
    AliasField, BatchJob, BatchProgress, BatchResult, BatchRow, BatchSummary, CsvImport,
    ExecutionMode, ReportSource,
};
use crate::error::{AppError, Result};
use crate::fields::template_fields;
use crate::proxy::HttpMethod;
use crate::server::AppState;
use crate::template::{token_names, MissingValuePolicy};

/// Generation key used when the caller names no workspace
const DEFAULT_RUN_KEY: &str = "default";

#[derive(Debug, Deserialize)]
pub struct CsvTextRequest {
    pub csv: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBatchRequest {
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    pub template: String,
    #[serde(default)]
    pub request_fields: Vec<AliasField>,

    /// CSV text; the first record is the header
    pub csv: Option<String>,
    /// Rows already parsed by the caller; used when `csv` is absent
    pub rows: Option<Vec<BatchRow>>,

    pub mode: Option<ExecutionMode>,
    pub concurrency: Option<usize>,
    pub pacing_ms: Option<u64>,
    pub coerce_loose_types: Option<bool>,
    pub missing_values: Option<MissingValuePolicy>,

    /// Runs sharing a key supersede each other
    pub run_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBatchResponse {
    pub generation: u64,
    /// A newer run with the same key started before this one finished
    pub superseded: bool,
    pub summary: BatchSummary,
    pub results: Vec<BatchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBatchRequest {
    pub run_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelBatchResponse {
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct TemplateTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub results: Vec<BatchResult>,
    pub fields: Vec<AliasField>,
    #[serde(default)]
    pub source: ReportSource,
    /// Body template; enables the request-side visibility filter
    pub template: Option<String>,
    /// Paths currently available on the chosen side
    pub available_fields: Option<Vec<String>>,
}

/// POST /api/v1/batch/import - Parse CSV text into rows
#[tracing::instrument(name = "http.import_csv", skip_all)]
pub async fn import_csv(
    State(state): State<AppState>,
    Json(request): Json<CsvTextRequest>,
) -> Json<CsvImport> {
    Json(batch::import(&request.csv, state.settings.batch.max_rows))
}

/// POST /api/v1/batch/run - Execute a template once per row
#[tracing::instrument(
    name = "http.run_batch",
    skip(state, request),
    fields(endpoint = %request.endpoint, method = %request.method)
)]
pub async fn run_batch(
    State(state): State<AppState>,
    Json(request): Json<RunBatchRequest>,
) -> Result<Json<RunBatchResponse>> {
    let config = &state.settings.batch;

    let rows = match (request.csv, request.rows) {
        (Some(csv), _) => batch::parse_rows(&csv)?.1,
        (None, Some(rows)) => rows,
        (None, None) => {
            return Err(AppError::Validation(
                "either csv or rows must be provided".to_string(),
            ))
        }
    };
    if rows.len() > config.max_rows {
        return Err(AppError::Validation(format!(
            "batch has {} rows, the limit is {}",
            rows.len(),
            config.max_rows
        )));
    }

    let job = BatchJob {
        endpoint: request.endpoint,
        method: request.method,
        headers: request.headers,
        template: request.template,
        request_fields: request.request_fields,
        coerce_loose_types: request
            .coerce_loose_types
            .unwrap_or(config.coerce_loose_types),
        missing_values: request.missing_values.unwrap_or(config.missing_values),
    };

    let mut policy = config.policy_with(request.mode, request.concurrency);
    if let Some(pacing_ms) = request.pacing_ms {
        policy.pacing_ms = pacing_ms;
    }

    let key = request.run_key.as_deref().unwrap_or(DEFAULT_RUN_KEY);
    let ticket = state.batches.begin(key);

    let results = batch::run(
        rows,
        job,
        state.proxy.as_ref(),
        policy,
        &ticket,
        |progress: BatchProgress| {
            tracing::debug!(done = progress.done, total = progress.total, "Batch progress");
        },
    )
    .await;

    Ok(Json(RunBatchResponse {
        generation: ticket.id(),
        superseded: !ticket.is_current(),
        summary: summarize(&results),
        results,
    }))
}

/// POST /api/v1/batch/cancel - Supersede the in-flight run for a key
#[tracing::instrument(name = "http.cancel_batch", skip_all)]
pub async fn cancel_batch(
    State(state): State<AppState>,
    Json(request): Json<CancelBatchRequest>,
) -> Json<CancelBatchResponse> {
    let key = request.run_key.as_deref().unwrap_or(DEFAULT_RUN_KEY);
    Json(CancelBatchResponse {
        cancelled: state.batches.cancel(key),
    })
}

/// POST /api/v1/batch/template - CSV header made of the template's placeholders
#[tracing::instrument(name = "http.batch_template", skip_all)]
pub async fn batch_template(Json(request): Json<TemplateTextRequest>) -> Result<Response> {
    let csv = csv_template(&token_names(&request.text))?;
    Ok(csv_attachment(csv, "template.csv"))
}

/// POST /api/v1/batch/report - CSV export of results for a field selection
#[tracing::instrument(name = "http.batch_report", skip_all, fields(source = ?request.source))]
pub async fn batch_report(Json(request): Json<ReportRequest>) -> Result<Response> {
    let fields = match (request.source, &request.template) {
        (ReportSource::Request, Some(template)) => {
            let available = request
                .available_fields
                .clone()
                .unwrap_or_else(|| template_fields(template));
            visible_request_fields(&request.fields, &available, &token_names(template), template)
        }
        _ => match &request.available_fields {
            Some(available) => visible_response_fields(&request.fields, available),
            None => request.fields.clone(),
        },
    };

    let csv = export_csv(&request.results, &fields, request.source)?;
    let filename = match request.source {
        ReportSource::Request => "report-request.csv",
        ReportSource::Response => "report-response.csv",
    };
    Ok(csv_attachment(csv, filename))
}

fn csv_attachment(csv: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response()
}
