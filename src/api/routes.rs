use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::batch::{batch_report, batch_template, cancel_batch, import_csv, run_batch};
use super::health::health;
use super::metrics::prometheus_metrics;
use super::proxy::proxy;
use super::template::{
    format_template, substitute_template, template_field_paths, template_highlights,
    template_placeholders, validate_template,
};
use super::workspace::{
    create_workspace, delete_workspace, dispatch_actions, get_workspace, list_workspaces,
    send_workspace,
};

pub fn api_routes(state: AppState) -> Router<AppState> {
    // Routes that reach upstream services require the API key when one is set
    let outbound = Router::new()
        .route("/api/proxy", post(proxy))
        .route("/api/v1/batch/run", post(run_batch))
        .route("/api/v1/batch/cancel", post(cancel_batch))
        .route("/api/v1/workspaces/{id}/send", post(send_workspace))
        .route_layer(middleware::from_fn_with_state(state, api_key_auth));

    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Template engine
                .route("/template/validate", post(validate_template))
                .route("/template/format", post(format_template))
                .route("/template/placeholders", post(template_placeholders))
                .route("/template/substitute", post(substitute_template))
                .route("/template/fields", post(template_field_paths))
                .route("/template/highlights", post(template_highlights))
                // Batch helpers
                .route("/batch/import", post(import_csv))
                .route("/batch/template", post(batch_template))
                .route("/batch/report", post(batch_report))
                // Workspaces
                .route("/workspaces", post(create_workspace).get(list_workspaces))
                .route(
                    "/workspaces/{id}",
                    get(get_workspace).delete(delete_workspace),
                )
                .route("/workspaces/{id}/actions", post(dispatch_actions)),
        )
        .merge(outbound)
}
