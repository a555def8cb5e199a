//! Proxy endpoint.

use axum::{extract::State, Json};

use crate::proxy::{ProxyRequest, ProxyResponse};
use crate::server::AppState;

/// POST /api/proxy - Forward one request upstream.
///
/// Always answers 200; the upstream status (or `0` for transport failures)
/// is carried in the body.
#[tracing::instrument(
    name = "http.proxy",
    skip(state, request),
    fields(endpoint = %request.endpoint, method = %request.method)
)]
pub async fn proxy(
    State(state): State<AppState>,
    Json(request): Json<ProxyRequest>,
) -> Json<ProxyResponse> {
    Json(state.proxy.invoke(request).await)
}
