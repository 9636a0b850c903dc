//! Refresh endpoint client and session-expiry hook.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use crate::config::AuthConfig;
use crate::errors::{ApiError, ApiResult};
use crate::http::{ApiRequest, Transport};

/// Exchanges the current (possibly stale) credential for a new one.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, current: Option<String>) -> ApiResult<String>;
}

/// Called when a refresh fails and the session has been torn down.
pub trait ReauthHandler: Send + Sync {
    /// `login_path` is the configured re-authentication entry point.
    fn reauthenticate(&self, login_path: &str);
}

impl<F> ReauthHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn reauthenticate(&self, login_path: &str) {
        self(login_path)
    }
}

/// Default hook: log that the user has to sign in again.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReauth;

impl ReauthHandler for LogReauth {
    fn reauthenticate(&self, login_path: &str) {
        tracing::warn!(login_path, "Session expired, re-authentication required");
    }
}

/// `POST <refresh_path>` through the raw transport (never the pipeline).
pub struct HttpTokenRefresher {
    transport: Arc<dyn Transport>,
    refresh_path: String,
    token_field: String,
}

impl HttpTokenRefresher {
    pub fn new(transport: Arc<dyn Transport>, config: &AuthConfig) -> Self {
        Self {
            transport,
            refresh_path: config.refresh_path.clone(),
            token_field: config.token_field.clone(),
        }
    }

    fn extract_token(&self, body: &serde_json::Value) -> Option<String> {
        if let Some(token) = body.as_str() {
            return (!token.is_empty()).then(|| token.to_string());
        }
        [self.token_field.as_str(), "access_token"]
            .iter()
            .find_map(|field| body.get(field).and_then(|v| v.as_str()).filter(|t| !t.is_empty()))
            .map(str::to_string)
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, current: Option<String>) -> ApiResult<String> {
        let mut request = ApiRequest::new(Method::POST, self.refresh_path.clone());
        if let Some(token) = current.as_deref() {
            request.set_bearer(token);
        }

        let response = self.transport.send(&request).await?;
        self.extract_token(&response.body).ok_or_else(|| {
            ApiError::new(format!(
                "Refresh response did not contain a '{}' field",
                self.token_field
            ))
        })
    }
}

impl std::fmt::Debug for HttpTokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTokenRefresher")
            .field("refresh_path", &self.refresh_path)
            .field("token_field", &self.token_field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiResponse;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubTransport {
        body: serde_json::Value,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((request.path.clone(), request.bearer().map(str::to_string)));
            Ok(ApiResponse::ok(self.body.clone()))
        }
    }

    fn refresher(body: serde_json::Value) -> (HttpTokenRefresher, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport {
            body,
            seen: Mutex::new(Vec::new()),
        });
        (HttpTokenRefresher::new(transport.clone(), &AuthConfig::default()), transport)
    }

    #[tokio::test]
    async fn test_posts_current_token() {
        let (refresher, transport) = refresher(json!({"token": "fresh"}));
        let token = refresher.refresh(Some("stale".into())).await.unwrap();

        assert_eq!(token, "fresh");
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0], ("/auth/refresh".to_string(), Some("stale".to_string())));
    }

    #[tokio::test]
    async fn test_accepts_access_token_field() {
        let (refresher, _) = refresher(json!({"access_token": "oauth-style"}));
        assert_eq!(refresher.refresh(None).await.unwrap(), "oauth-style");
    }

    #[tokio::test]
    async fn test_missing_token_is_error() {
        let (refresher, _) = refresher(json!({"ok": true}));
        let err = refresher.refresh(None).await.unwrap_err();
        assert!(err.message.contains("'token'"));
    }

    #[tokio::test]
    async fn test_empty_token_field_falls_through() {
        let (refresher, _) = refresher(json!({"token": "", "access_token": "oauth-style"}));
        assert_eq!(refresher.refresh(None).await.unwrap(), "oauth-style");
    }

    #[tokio::test]
    async fn test_empty_tokens_are_rejected() {
        let (bare, _) = refresher(json!(""));
        assert!(bare.refresh(None).await.is_err());

        let (fields, _) = refresher(json!({"token": "", "access_token": ""}));
        assert!(fields.refresh(None).await.is_err());
    }

    #[test]
    fn test_closure_reauth_handler() {
        let hits = Mutex::new(Vec::new());
        let handler = |path: &str| hits.lock().unwrap().push(path.to_string());
        handler.reauthenticate("/login");
        assert_eq!(hits.lock().unwrap().as_slice(), ["/login".to_string()]);
    }
}
