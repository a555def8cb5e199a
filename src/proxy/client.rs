//! reqwest-backed proxy collaborator

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::metrics::ProxyMetrics;

use super::types::{HttpMethod, ProxyRequest, ProxyResponse};
use super::ProxyInvoke;

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Failures while forwarding; always converted into a `status 0` response
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("failed to encode body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Forwards requests with a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestProxy {
    client: reqwest::Client,
}

impl ReqwestProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn forward(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let url = reqwest::Url::parse(&request.endpoint).map_err(|e| {
            ProxyError::InvalidEndpoint {
                endpoint: request.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;

        let payload = prepare_body(request.method, request.body.as_ref())?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ProxyError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ProxyError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }
        if !headers.contains_key(CONTENT_TYPE) {
            if let Some(content_type) = infer_content_type(payload.as_deref()) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .headers(headers);
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }

        let upstream = builder.send().await?;
        let status = upstream.status().as_u16();
        let is_json = upstream
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains(JSON_CONTENT_TYPE))
            .unwrap_or(false);
        let text = upstream.text().await?;

        let response = if is_json {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => Value::String(text),
            }
        } else {
            Value::String(text)
        };

        Ok(ProxyResponse::new(status, response))
    }
}

#[async_trait]
impl ProxyInvoke for ReqwestProxy {
    async fn invoke(&self, request: ProxyRequest) -> ProxyResponse {
        let started = Instant::now();
        let result = self.forward(&request).await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                ProxyMetrics::record(response.status, elapsed);
                tracing::debug!(
                    method = %request.method,
                    endpoint = %request.endpoint,
                    status = response.status,
                    duration_ms = elapsed.as_millis() as u64,
                    "Upstream responded"
                );
                response
            }
            Err(e) => {
                ProxyMetrics::record(0, elapsed);
                tracing::warn!(
                    method = %request.method,
                    endpoint = %request.endpoint,
                    error = %e,
                    "Proxy request failed"
                );
                ProxyResponse::transport_error(e.to_string())
            }
        }
    }
}

/// Serialize the outgoing body. Strings are forwarded as-is, everything else
/// as JSON; GET requests never carry a body.
pub fn prepare_body(method: HttpMethod, body: Option<&Value>) -> Result<Option<String>, ProxyError> {
    if !method.allows_body() {
        return Ok(None);
    }
    match body {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Ok(Some(serde_json::to_string(other)?)),
    }
}

/// Content type for a payload the caller did not label
pub fn infer_content_type(payload: Option<&str>) -> Option<&'static str> {
    let payload = payload?;
    if serde_json::from_str::<serde::de::IgnoredAny>(payload).is_ok() {
        Some(JSON_CONTENT_TYPE)
    } else {
        Some(TEXT_CONTENT_TYPE)
    }
}
