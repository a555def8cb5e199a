//! HTTP API integration tests
//!
//! Each test serves the full router on an ephemeral port with a stub proxy
//! and talks to it over real HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use api_workbench::config::Settings;
use api_workbench::proxy::{ProxyInvoke, ProxyRequest, ProxyResponse};
use api_workbench::server::{create_app, AppState};

/// Answers 201 with the request it received
struct EchoUpstream;

#[async_trait]
impl ProxyInvoke for EchoUpstream {
    async fn invoke(&self, request: ProxyRequest) -> ProxyResponse {
        if request.endpoint.contains("unreachable") {
            return ProxyResponse::transport_error("connection refused");
        }
        ProxyResponse::new(
            201,
            json!({
                "id": 101,
                "method": request.method.as_str(),
                "received": request.body,
            }),
        )
    }
}

async fn spawn_app(settings: Settings) -> String {
    let state = AppState::with_proxy(settings, Arc::new(EchoUpstream));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn post_json(base: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let base = spawn_app(Settings::default()).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["workspaces"], 0);
    assert_eq!(body["batch"]["concurrency"], 3);
    assert_eq!(body["batch"]["mode"], "concurrent");
}

#[tokio::test]
async fn test_metrics_exposed() {
    let base = spawn_app(Settings::default()).await;

    // Touch a counter first so the registry has something to render
    post_json(&base, "/api/v1/template/validate", json!({ "text": "{}" })).await;

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();
    assert!(text.contains("workbench_template_validations_total"));
}

// ============================================================================
// Template engine
// ============================================================================

#[tokio::test]
async fn test_validate_template() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(
        &base,
        "/api/v1/template/validate",
        json!({ "text": r#"{"userId": {{user_id}}, "title": "{{title}}"}"# }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["errors"], json!([]));

    let (_, body) = post_json(
        &base,
        "/api/v1/template/validate",
        json!({ "text": "{\n  \"a\": {{x}},\n}" }),
    )
    .await;
    assert_eq!(body["isValid"], false);
    assert!(!body["errors"].as_array().unwrap().is_empty());
    assert_eq!(body["markers"][0]["severity"], "error");
}

#[tokio::test]
async fn test_format_template() {
    let base = spawn_app(Settings::default()).await;

    let (_, body) = post_json(
        &base,
        "/api/v1/template/format",
        json!({ "text": r#"{"a":{{x}},"b":"{{y}}"}"# }),
    )
    .await;
    assert_eq!(body["text"], "{\n  \"a\": {{x}},\n  \"b\": \"{{y}}\"\n}");

    // Unparseable input comes back untouched
    let (_, body) = post_json(&base, "/api/v1/template/format", json!({ "text": "{oops" })).await;
    assert_eq!(body["text"], "{oops");
}

#[tokio::test]
async fn test_substitute_template() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(
        &base,
        "/api/v1/template/substitute",
        json!({
            "text": r#"{"n": {{count}}, "tag": "{{tag}}"}"#,
            "values": { "count": 3 },
            "missingValues": "null",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"], json!({ "n": 3, "tag": "" }));

    let (status, body) = post_json(
        &base,
        "/api/v1/template/substitute",
        json!({
            "text": r#"{"n": {{count}}, "tag": "{{tag}}"}"#,
            "values": {},
            "missingValues": "reject",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "TEMPLATE_ERROR");
}

#[tokio::test]
async fn test_template_fields() {
    let base = spawn_app(Settings::default()).await;

    let (_, body) = post_json(
        &base,
        "/api/v1/template/fields",
        json!({ "value": { "user": { "id": 1, "tags": ["a"] } } }),
    )
    .await;
    assert_eq!(body["fields"], json!(["user.id", "user.tags[0]"]));
}

// ============================================================================
// Batch
// ============================================================================

#[tokio::test]
async fn test_batch_run_over_csv() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(
        &base,
        "/api/v1/batch/run",
        json!({
            "endpoint": "http://upstream.test/posts",
            "method": "POST",
            "template": r#"{"userId": {{user_id}}, "title": "{{title}}"}"#,
            "csv": "user_id,title\n1,First\n2,Second\n",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["superseded"], false);
    assert_eq!(body["summary"]["total"], 2);
    assert_eq!(body["summary"]["succeeded"], 2);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], 201);
    assert_eq!(results[0]["label"], "Row 1");
    assert_eq!(results[1]["payload"], json!({ "userId": 2, "title": "Second" }));
    assert_eq!(results[1]["response"]["received"]["title"], "Second");
}

#[tokio::test]
async fn test_batch_run_requires_rows() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(
        &base,
        "/api/v1/batch/run",
        json!({ "endpoint": "http://upstream.test", "template": "{}" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_batch_import_reports_errors_inline() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(&base, "/api/v1/batch/import", json!({ "csv": "" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], json!([]));
    assert!(body["error"].is_string());

    let (_, body) = post_json(&base, "/api/v1/batch/import", json!({ "csv": "a,b\n1,2\n" })).await;
    assert_eq!(body["columns"], json!(["a", "b"]));
    assert_eq!(body["rows"], json!([{ "a": "1", "b": "2" }]));
}

#[tokio::test]
async fn test_batch_template_download() {
    let base = spawn_app(Settings::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/batch/template", base))
        .json(&json!({ "text": r#"{"a": {{x}}, "b": "{{y}}", "c": {{x}}}"# }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("template.csv"));
    assert_eq!(response.text().await.unwrap(), "x,y\n");
}

#[tokio::test]
async fn test_cancel_unknown_run_key() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(&base, "/api/v1/batch/cancel", json!({ "runKey": "nope" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

// ============================================================================
// Proxy and API key
// ============================================================================

#[tokio::test]
async fn test_proxy_reports_transport_failure_in_body() {
    let base = spawn_app(Settings::default()).await;

    let (status, body) = post_json(
        &base,
        "/api/proxy",
        json!({ "endpoint": "http://unreachable.test", "method": "GET" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    assert_eq!(body["response"]["error"], "connection refused");
}

#[tokio::test]
async fn test_api_key_guards_outbound_routes() {
    let mut settings = Settings::default();
    settings.api.key = Some("secret".to_string());
    let base = spawn_app(settings).await;
    let client = reqwest::Client::new();
    let request = json!({ "endpoint": "http://upstream.test", "method": "POST", "body": {} });

    let response = client
        .post(format!("{}/api/proxy", base))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{}/api/proxy", base))
        .header("X-API-Key", "wrong")
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{}/api/proxy", base))
        .header("X-API-Key", "secret")
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 201);

    // Pure template routes stay open
    let (status, _) = post_json(&base, "/api/v1/template/format", json!({ "text": "{}" })).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Workspaces
// ============================================================================

#[tokio::test]
async fn test_workspace_lifecycle() {
    let base = spawn_app(Settings::default()).await;
    let client = reqwest::Client::new();

    let (status, created) = post_json(
        &base,
        "/api/v1/workspaces",
        json!({
            "name": "posts",
            "endpoint": "http://upstream.test/posts",
            "body": r#"{"userId": {{user_id}}, "title": "{{post_title}}"}"#,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "posts");
    assert_eq!(created["method"], "POST");
    assert_eq!(created["validation"]["isValid"], true);
    assert_eq!(created["availableRequestFields"], json!(["userId", "title"]));

    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = post_json(
        &base,
        &format!("/api/v1/workspaces/{}/actions", id),
        json!({
            "actions": [
                { "type": "set_placeholder_value", "name": "user_id", "value": 7 },
                { "type": "set_placeholder_value", "name": "post_title", "value": "Hello" },
                { "type": "toggle_request_field", "path": "title" },
                { "type": "set_request_alias", "path": "title", "alias": "Title" },
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["placeholderValues"]["post_title"], "Hello");
    assert_eq!(
        updated["selectedRequestFields"],
        json!([{ "path": "title", "alias": "Title" }])
    );

    let (status, sent) = post_json(&base, &format!("/api/v1/workspaces/{}/send", id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["response"]["status"], 201);
    assert_eq!(
        sent["response"]["response"]["received"],
        json!({ "userId": 7, "title": "Hello" })
    );
    let response_fields = sent["availableResponseFields"].as_array().unwrap();
    assert!(response_fields.contains(&json!("id")));

    let list: Value = client
        .get(format!("{}/api/v1/workspaces", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);

    let response = client
        .delete(format!("{}/api/v1/workspaces/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/api/v1/workspaces/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
