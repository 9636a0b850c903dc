//! Fallback registry.
//!
//! # Responsibilities
//! - Map a service name to a substitute handler
//! - Run the handler when the primary call cannot succeed
//!
//! # Design Decisions
//! - Registering an existing name replaces the handler (last writer wins)
//! - A missing handler is its own error, never silently ignored
//! - Handlers return a normal success envelope; the pipeline tags its origin

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use reqwest::Method;
use thiserror::Error;

use crate::errors::ApiError;
use crate::http::{ApiRequest, ApiResponse};
use crate::observability::metrics;

/// Errors from [`FallbackRegistry::execute`].
#[derive(Debug, Clone, Error)]
pub enum FallbackError {
    #[error("No fallback registered for service '{0}'")]
    NotRegistered(String),

    #[error("Fallback for service '{service}' failed: {source}")]
    Handler { service: String, source: ApiError },
}

type Handler = Arc<dyn Fn(ApiRequest) -> BoxFuture<'static, Result<ApiResponse, ApiError>> + Send + Sync>;

/// Stable service key for a request: `METHOD path`, query string excluded.
pub fn fallback_key(method: &Method, path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    format!("{} {}", method.as_str(), path)
}

/// Concurrent map of service name to fallback handler.
#[derive(Clone, Default)]
pub struct FallbackRegistry {
    handlers: Arc<DashMap<String, Handler>>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `service`, replacing any previous one.
    pub fn register<F, Fut>(&self, service: impl Into<String>, handler: F)
    where
        F: Fn(ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiResponse, ApiError>> + Send + 'static,
    {
        let service = service.into();
        let handler: Handler = Arc::new(move |request| -> BoxFuture<'static, Result<ApiResponse, ApiError>> {
            Box::pin(handler(request))
        });
        if self.handlers.insert(service.clone(), handler).is_some() {
            tracing::debug!(service = %service, "Fallback handler replaced");
        } else {
            tracing::debug!(service = %service, "Fallback handler registered");
        }
    }

    /// Remove the handler for `service`. Returns whether one existed.
    pub fn unregister(&self, service: &str) -> bool {
        self.handlers.remove(service).is_some()
    }

    pub fn contains(&self, service: &str) -> bool {
        self.handlers.contains_key(service)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the fallback registered for `service`.
    pub async fn execute(&self, service: &str, request: ApiRequest) -> Result<ApiResponse, FallbackError> {
        // Clone the handler out so the map shard is not locked across the await.
        let handler = match self.handlers.get(service) {
            Some(entry) => entry.value().clone(),
            None => {
                tracing::debug!(service, "No fallback registered");
                metrics::record_fallback("missing");
                return Err(FallbackError::NotRegistered(service.to_string()));
            }
        };

        match handler(request).await {
            Ok(response) => {
                tracing::info!(service, "Served fallback response");
                metrics::record_fallback("served");
                Ok(response)
            }
            Err(source) => {
                tracing::warn!(service, error = %source, "Fallback handler failed");
                metrics::record_fallback("failed");
                Err(FallbackError::Handler {
                    service: service.to_string(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for FallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut services: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        services.sort();
        f.debug_struct("FallbackRegistry").field("services", &services).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fallback_key() {
        assert_eq!(fallback_key(&Method::GET, "/users"), "GET /users");
        assert_eq!(fallback_key(&Method::POST, "/search?q=rust#top"), "POST /search");
    }

    #[tokio::test]
    async fn test_execute_registered_handler() {
        let registry = FallbackRegistry::new();
        registry.register("GET /users", |_req| async { Ok::<_, ApiError>(ApiResponse::ok(json!({"users": []}))) });

        let response = registry
            .execute("GET /users", ApiRequest::get("/users"))
            .await
            .unwrap();
        assert_eq!(response.body, json!({"users": []}));
    }

    #[tokio::test]
    async fn test_missing_fallback_is_distinct_error() {
        let registry = FallbackRegistry::new();
        // Creating the future must not fail; the error surfaces when awaited.
        let pending = registry.execute("GET /nothing", ApiRequest::get("/nothing"));
        let err = pending.await.unwrap_err();

        assert!(matches!(err, FallbackError::NotRegistered(ref s) if s == "GET /nothing"));
        assert_eq!(err.to_string(), "No fallback registered for service 'GET /nothing'");
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = FallbackRegistry::new();
        registry.register("svc", |_req| async { Ok::<_, ApiError>(ApiResponse::ok(json!(1))) });
        registry.register("svc", |_req| async { Ok::<_, ApiError>(ApiResponse::ok(json!(2))) });

        assert_eq!(registry.len(), 1);
        let response = registry.execute("svc", ApiRequest::get("/")).await.unwrap();
        assert_eq!(response.body, json!(2));
    }

    #[tokio::test]
    async fn test_handler_receives_request_and_can_fail() {
        let registry = FallbackRegistry::new();
        registry.register("echo", |req: ApiRequest| async move {
            Ok::<_, ApiError>(ApiResponse::ok(json!({ "path": req.path })))
        });
        registry.register("broken", |_req| async { Err::<ApiResponse, _>(ApiError::new("cache empty")) });

        let response = registry.execute("echo", ApiRequest::get("/items/3")).await.unwrap();
        assert_eq!(response.body["path"], "/items/3");

        let err = registry.execute("broken", ApiRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, FallbackError::Handler { .. }));
        assert!(registry.unregister("broken"));
        assert!(!registry.contains("broken"));
    }
}
