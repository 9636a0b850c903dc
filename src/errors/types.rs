//! The error value flowing through the resilience layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed call, as observed by the pipeline.
///
/// `status` is present iff the remote side produced a response. `from_transport`
/// marks errors raised by the HTTP transport itself, as opposed to application code.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub from_transport: bool,
    pub timed_out: bool,
    /// Response body, when one was received.
    pub body: Option<serde_json::Value>,
    /// Messages of the underlying cause chain, outermost first.
    pub causes: Vec<String>,
}

impl ApiError {
    /// An application-level error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            from_transport: false,
            timed_out: false,
            body: None,
            causes: Vec::new(),
        }
    }

    /// A transport failure where no response was received.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            from_transport: true,
            ..Self::new(message)
        }
    }

    /// A transport timeout; no response was received.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            from_transport: true,
            timed_out: true,
            ..Self::new(message)
        }
    }

    /// A non-success HTTP response.
    ///
    /// The message is taken from a `message` or `error` string field of a JSON
    /// body when there is one.
    pub fn from_response(status: u16, body: Option<serde_json::Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| {
                b.get("message")
                    .or_else(|| b.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Request failed with status code {}", status));

        Self {
            message,
            status: Some(status),
            from_transport: true,
            timed_out: false,
            body,
            causes: Vec::new(),
        }
    }

    /// Whether a response object exists for this error.
    pub fn has_response(&self) -> bool {
        self.status.is_some()
    }

    /// Attach a cause message to the chain.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Message plus cause chain, one per line. Only meant for developer views.
    pub fn detail(&self) -> String {
        let mut out = self.message.clone();
        if let Some(status) = self.status {
            out.push_str(&format!(" (status {})", status));
        }
        for cause in &self.causes {
            out.push_str("\n  caused by: ");
            out.push_str(cause);
        }
        out
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
            from_transport: true,
            timed_out: err.is_timeout(),
            body: None,
            causes,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        let timed_out = err.kind() == std::io::ErrorKind::TimedOut;
        Self {
            timed_out,
            ..Self::new(err.to_string())
        }
    }
}

/// Result type for calls that may fail with an [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_json_body() {
        let err = ApiError::from_response(422, Some(json!({"message": "email is required"})));
        assert_eq!(err.to_string(), "email is required");
        assert_eq!(err.status, Some(422));
        assert!(err.has_response());

        let err = ApiError::from_response(500, Some(json!({"error": "boom"})));
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_message_without_body() {
        let err = ApiError::from_response(503, None);
        assert_eq!(err.message, "Request failed with status code 503");
    }

    #[test]
    fn test_detail_includes_causes() {
        let err = ApiError::network("request failed").with_cause("connection refused");
        let detail = err.detail();
        assert!(detail.starts_with("request failed"));
        assert!(detail.contains("caused by: connection refused"));
        assert_eq!(err.to_string(), "request failed");
    }

    #[test]
    fn test_io_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        let err = ApiError::from(io);
        assert!(err.timed_out);
        assert!(!err.from_transport);
    }
}
