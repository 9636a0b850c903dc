//! Request and response envelopes exchanged with the transport.
//!
//! # Responsibilities
//! - Carry method, path, headers and JSON body of an outbound call
//! - Generate a unique request ID for correlation
//! - Track the per-request recovery flags (auth retry, policy retry)
//! - Mark where a successful response came from

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::ErrorContext;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// An outbound API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub id: Uuid,
    pub method: Method,
    /// Path relative to the client base URL, optionally with a query string.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    /// Caller tags copied into error records.
    pub tags: Vec<(String, String)>,
    /// Message shown to users if this call ends in a rejection.
    pub user_message: Option<String>,
    pub(crate) auth_retried: bool,
    pub(crate) retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            tags: Vec::new(),
            user_message: None,
            auth_retried: false,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header; invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(request_id = %self.id, header = name, "Ignoring invalid header"),
        }
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.set_bearer(token);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    /// Replace the `Authorization` header with a bearer credential.
    pub fn set_bearer(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!(request_id = %self.id, "Credential is not a valid header value; sending without it");
                self.headers.remove(AUTHORIZATION);
            }
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Whether this request was already replayed after a token refresh.
    pub fn auth_retried(&self) -> bool {
        self.auth_retried
    }

    /// Whether this request already went through the retry policy.
    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Error context for a failure of this request.
    pub fn error_context(&self, status: Option<u16>) -> ErrorContext {
        let mut context = ErrorContext::new()
            .with("request_id", self.id)
            .with("method", &self.method)
            .with("url", &self.path);
        if let Some(status) = status {
            context.insert("status", status);
        }
        for (key, value) in &self.tags {
            context.insert(key.clone(), value);
        }
        context
    }
}

/// Where a successful response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// First call succeeded.
    Primary,
    /// Succeeded after a token refresh.
    Replayed,
    /// Succeeded within the retry policy.
    Retried,
    /// Served by a registered fallback.
    Fallback,
}

impl ResponseOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseOrigin::Primary => "primary",
            ResponseOrigin::Replayed => "replayed",
            ResponseOrigin::Retried => "retried",
            ResponseOrigin::Fallback => "fallback",
        }
    }
}

/// A successful response envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
    pub origin: ResponseOrigin,
}

impl ApiResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            origin: ResponseOrigin::Primary,
        }
    }

    /// A 200 response with `body`.
    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    /// Whether this response came from a fallback rather than the API.
    pub fn is_degraded(&self) -> bool {
        self.origin == ResponseOrigin::Fallback
    }

    /// JSON view used by the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "origin": self.origin,
            "body": self.body,
        })
    }
}
