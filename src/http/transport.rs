//! Outbound transport.
//!
//! # Responsibilities
//! - Define the seam between the pipeline and the network
//! - Provide a reqwest-backed implementation with base URL and timeout
//!
//! # Design Decisions
//! - Non-2xx statuses are returned as errors, carrying the parsed body
//! - The request ID is propagated on every call
//! - Timeouts belong to the transport, not to the pipeline

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use url::Url;

use crate::config::ClientConfig;
use crate::errors::{ApiError, ApiResult};
use crate::http::request::{ApiRequest, ApiResponse, X_REQUEST_ID};

/// Sends one request and returns the response envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse>;
}

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::new(format!("Invalid base URL '{}': {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ApiError::from)?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` against the base URL, keeping any base path prefix.
    pub fn url_for(&self, path: &str) -> ApiResult<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::new(format!("Invalid request path '{}': {}", path, e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url_for(&request.path)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Ok(id) = HeaderValue::from_str(&request.id.to_string()) {
            builder = builder.header(X_REQUEST_ID, id);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            "Sending request"
        );

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = parse_body(&bytes);

        if !status.is_success() {
            tracing::debug!(request_id = %request.id, status = %status, "Request failed");
            let body = (!body.is_null()).then_some(body);
            return Err(ApiError::from_response(status.as_u16(), body));
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body,
            origin: crate::http::ResponseOrigin::Primary,
        })
    }
}

/// JSON if possible, a string otherwise, null when empty.
fn parse_body(bytes: &[u8]) -> serde_json::Value {
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
