//! Proxy client integration tests against a local upstream

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use indexmap::IndexMap;
use serde_json::{json, Value};

use api_workbench::config::ProxyConfig;
use api_workbench::proxy::{HttpMethod, ProxyInvoke, ProxyRequest, ReqwestProxy, StatusClass};

/// Reports what it received
async fn echo(headers: HeaderMap, body: String) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    Json(json!({
        "contentType": header("content-type"),
        "token": header("x-token"),
        "body": body,
    }))
}

async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/echo", post(echo).put(echo).get(echo))
        .route("/text", get(|| async { "pong" }))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "error": "no such post" }))) }),
        )
        .route(
            "/mislabeled",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "not json") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn proxy() -> ReqwestProxy {
    ReqwestProxy::new(&ProxyConfig::default()).unwrap()
}

#[tokio::test]
async fn test_json_body_gets_json_content_type() {
    let base = spawn_upstream().await;

    let response = proxy()
        .invoke(ProxyRequest::new(format!("{}/echo", base), HttpMethod::Post).body(json!({ "a": 1 })))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.class(), StatusClass::Success);
    assert_eq!(response.response["contentType"], "application/json");
    assert_eq!(response.response["body"], r#"{"a":1}"#);
}

#[tokio::test]
async fn test_string_body_forwarded_raw() {
    let base = spawn_upstream().await;

    let response = proxy()
        .invoke(ProxyRequest::new(format!("{}/echo", base), HttpMethod::Put).body(json!("plain words")))
        .await;

    assert_eq!(response.response["contentType"], "text/plain;charset=utf-8");
    assert_eq!(response.response["body"], "plain words");
}

#[tokio::test]
async fn test_get_drops_body() {
    let base = spawn_upstream().await;

    let response = proxy()
        .invoke(ProxyRequest::new(format!("{}/echo", base), HttpMethod::Get).body(json!({ "a": 1 })))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.response["body"], "");
    assert_eq!(response.response["contentType"], "");
}

#[tokio::test]
async fn test_caller_headers_win() {
    let base = spawn_upstream().await;

    let mut headers = IndexMap::new();
    headers.insert("X-Token".to_string(), "abc".to_string());
    headers.insert("Content-Type".to_string(), "application/vnd.custom+json".to_string());

    let response = proxy()
        .invoke(
            ProxyRequest::new(format!("{}/echo", base), HttpMethod::Post)
                .headers(headers)
                .body(json!({})),
        )
        .await;

    assert_eq!(response.response["token"], "abc");
    assert_eq!(response.response["contentType"], "application/vnd.custom+json");
}

#[tokio::test]
async fn test_text_response_kept_as_string() {
    let base = spawn_upstream().await;

    let response = proxy()
        .invoke(ProxyRequest::new(format!("{}/text", base), HttpMethod::Get))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.response, json!("pong"));
}

#[tokio::test]
async fn test_mislabeled_json_falls_back_to_text() {
    let base = spawn_upstream().await;

    let response = proxy()
        .invoke(ProxyRequest::new(format!("{}/mislabeled", base), HttpMethod::Get))
        .await;

    assert_eq!(response.response, json!("not json"));
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let base = spawn_upstream().await;

    let response = proxy()
        .invoke(ProxyRequest::new(format!("{}/missing", base), HttpMethod::Get))
        .await;

    assert_eq!(response.status, 404);
    assert_eq!(response.class(), StatusClass::HttpError);
    assert_eq!(response.response["error"], "no such post");
}

#[tokio::test]
async fn test_unreachable_upstream_is_transport_error() {
    // Bind then drop a listener so the port is known to be closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let response = proxy()
        .invoke(ProxyRequest::new(format!("http://{}/posts", addr), HttpMethod::Post).body(json!({})))
        .await;

    assert_eq!(response.status, 0);
    assert_eq!(response.class(), StatusClass::TransportError);
    assert!(response.response["error"].is_string());
}
