//! Request interceptor pipeline.
//!
//! # Responsibilities
//! - Attach the stored bearer credential to every outgoing request
//! - Classify and record every failure
//! - Recover from failures: token refresh, retry, fallback, in that order
//! - Produce exactly one terminal outcome per request
//!
//! # Recovery Order
//! ```text
//! failure ─→ record
//!   401, not yet auth-retried   → refresh once, replay through the pipeline
//!   retryable, not yet retried  → retry policy over the raw transport
//!   retries exhausted or
//!   fallback-eligible           → registered fallback for "METHOD path"
//!   otherwise                   → reject with the user-facing message
//! ```

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::auth::{
    CredentialStore, HttpTokenRefresher, LogReauth, ReauthHandler, RefreshCoordinator, RefreshError,
    TokenRefresher,
};
use crate::config::{AuthConfig, RecoveryConfig};
use crate::errors::{ApiError, ErrorCategory, ErrorHandler, ErrorRecord};
use crate::http::request::{ApiRequest, ApiResponse, ResponseOrigin};
use crate::http::transport::Transport;
use crate::monitor::ErrorMonitor;
use crate::observability::metrics;
use crate::resilience::{fallback_key, FallbackError, FallbackRegistry, RetryError, RetryPolicy};

/// Terminal failure of a request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The credential could not be refreshed; the user has to sign in again.
    #[error("{user_message}")]
    Reauthenticate {
        user_message: String,
        record: Arc<ErrorRecord>,
        source: RefreshError,
    },

    /// No recovery applied or all recovery failed.
    #[error("{user_message}")]
    Rejected {
        user_message: String,
        record: Arc<ErrorRecord>,
        /// Full cause chain, only populated in development mode.
        debug_detail: Option<String>,
    },
}

impl PipelineError {
    pub fn user_message(&self) -> &str {
        match self {
            PipelineError::Reauthenticate { user_message, .. } | PipelineError::Rejected { user_message, .. } => {
                user_message
            }
        }
    }

    /// Record of the failure that decided the outcome.
    pub fn record(&self) -> &Arc<ErrorRecord> {
        match self {
            PipelineError::Reauthenticate { record, .. } | PipelineError::Rejected { record, .. } => record,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.record().category
    }

    /// JSON view used by the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "outcome": match self {
                PipelineError::Reauthenticate { .. } => "reauthenticate",
                PipelineError::Rejected { .. } => "rejected",
            },
            "category": self.category(),
            "severity": self.record().severity,
            "message": self.user_message(),
            "record_id": self.record().id,
        });
        if let PipelineError::Rejected { debug_detail: Some(detail), .. } = self {
            value["debug_detail"] = serde_json::Value::String(detail.clone());
        }
        value
    }
}

pub type PipelineResult = Result<ApiResponse, PipelineError>;

/// Wraps a [`Transport`] with credential handling and failure recovery.
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
    errors: ErrorHandler,
    fallbacks: FallbackRegistry,
    retry: Option<RetryPolicy>,
    retryable: Vec<ErrorCategory>,
    fallback_eligible: Vec<ErrorCategory>,
    development_mode: bool,
    cancel: CancellationToken,
}

impl RequestPipeline {
    pub fn builder(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialStore>) -> PipelineBuilder {
        PipelineBuilder::new(transport, credentials)
    }

    /// Send `request` and resolve to exactly one outcome.
    pub async fn send(&self, request: ApiRequest) -> PipelineResult {
        let result = self.dispatch(request).await;
        match &result {
            Ok(response) => metrics::record_request(response.origin.as_str()),
            Err(PipelineError::Reauthenticate { .. }) => metrics::record_request("reauthenticate"),
            Err(PipelineError::Rejected { .. }) => metrics::record_request("rejected"),
        }
        result
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn errors(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.fallbacks
    }

    // Boxed because a replay after refresh re-enters the pipeline.
    fn dispatch(&self, mut request: ApiRequest) -> BoxFuture<'_, PipelineResult> {
        Box::pin(async move {
            self.attach_credentials(&mut request);
            match self.transport.send(&request).await {
                Ok(response) => Ok(response),
                Err(error) => self.recover(request, error).await,
            }
        })
    }

    fn attach_credentials(&self, request: &mut ApiRequest) {
        if let Some(token) = self.credentials.get_token() {
            request.set_bearer(&token);
        }
    }

    fn record(&self, request: &ApiRequest, error: &ApiError) -> Arc<ErrorRecord> {
        self.errors
            .handle(error, request.error_context(error.status), request.user_message.clone())
    }

    async fn recover(&self, mut request: ApiRequest, error: ApiError) -> PipelineResult {
        let mut record = self.record(&request, &error);

        if error.status == Some(401) && !request.auth_retried {
            request.auth_retried = true;
            tracing::debug!(request_id = %request.id, "Unauthorized, refreshing credential");
            return match self.refresh.refresh().await {
                Ok(_) => self.dispatch(request).await.map(|mut response| {
                    if response.origin == ResponseOrigin::Primary {
                        response.origin = ResponseOrigin::Replayed;
                    }
                    response
                }),
                Err(source) => Err(PipelineError::Reauthenticate {
                    user_message: record.user_message(),
                    record,
                    source,
                }),
            };
        }

        let mut exhausted = false;
        if let Some(policy) = self.retry.as_ref() {
            if self.retryable.contains(&record.category) && !request.retried {
                request.retried = true;
                match self.retry_phase(policy, &request).await {
                    Ok(mut response) => {
                        response.origin = ResponseOrigin::Retried;
                        return Ok(response);
                    }
                    Err(RetryError::Failed(last)) => {
                        record = last;
                        exhausted = true;
                    }
                    Err(RetryError::Cancelled { last_error, .. }) => {
                        return Err(self.reject(last_error.unwrap_or(record)));
                    }
                }
            }
        }

        if exhausted || self.fallback_eligible.contains(&record.category) {
            let service = fallback_key(&request.method, &request.path);
            match self.fallbacks.execute(&service, request.clone()).await {
                Ok(mut response) => {
                    response.origin = ResponseOrigin::Fallback;
                    return Ok(response);
                }
                Err(FallbackError::NotRegistered(_)) => {}
                Err(FallbackError::Handler { source, .. }) => {
                    let context = request.error_context(source.status).with("fallback", &service);
                    self.errors.handle(&source, context, request.user_message.clone());
                }
            }
        }

        Err(self.reject(record))
    }

    /// Re-send the original call under the retry policy, recording every failed attempt.
    async fn retry_phase(
        &self,
        policy: &RetryPolicy,
        request: &ApiRequest,
    ) -> Result<ApiResponse, RetryError<Arc<ErrorRecord>>> {
        let label = format!("{} {}", request.method, request.path);
        policy
            .execute_cancellable(&label, &self.cancel, || {
                let mut attempt = request.clone();
                async move {
                    self.attach_credentials(&mut attempt);
                    match self.transport.send(&attempt).await {
                        Ok(response) => Ok(response),
                        Err(error) => Err(self.record(&attempt, &error)),
                    }
                }
            })
            .await
    }

    fn reject(&self, record: Arc<ErrorRecord>) -> PipelineError {
        let debug_detail = self.development_mode.then(|| record.error.detail());
        tracing::debug!(id = %record.id, category = %record.category, "Request rejected");
        PipelineError::Rejected {
            user_message: record.user_message(),
            record,
            debug_detail,
        }
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("refresh", &self.refresh)
            .field("fallbacks", &self.fallbacks)
            .field("retry", &self.retry)
            .field("retryable", &self.retryable)
            .field("fallback_eligible", &self.fallback_eligible)
            .field("development_mode", &self.development_mode)
            .finish()
    }
}

/// Assembles a [`RequestPipeline`]. Unset parts fall back to defaults.
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    auth: AuthConfig,
    refresher: Option<Arc<dyn TokenRefresher>>,
    reauth: Option<Arc<dyn ReauthHandler>>,
    errors: Option<ErrorHandler>,
    fallbacks: FallbackRegistry,
    retry: Option<RetryPolicy>,
    recovery: RecoveryConfig,
    development_mode: bool,
    cancel: CancellationToken,
}

impl PipelineBuilder {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
            auth: AuthConfig::default(),
            refresher: None,
            reauth: None,
            errors: None,
            fallbacks: FallbackRegistry::new(),
            retry: Some(RetryPolicy::default()),
            recovery: RecoveryConfig::default(),
            development_mode: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Override the refresh call (defaults to `POST <refresh_path>` on the transport).
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn reauth(mut self, reauth: Arc<dyn ReauthHandler>) -> Self {
        self.reauth = Some(reauth);
        self
    }

    pub fn errors(mut self, errors: ErrorHandler) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn fallbacks(mut self, fallbacks: FallbackRegistry) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// `None` disables the retry phase.
    pub fn retry(mut self, policy: Option<RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    pub fn recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    /// Token that aborts pending retry backoffs.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> RequestPipeline {
        let refresher = self
            .refresher
            .unwrap_or_else(|| Arc::new(HttpTokenRefresher::new(self.transport.clone(), &self.auth)));
        let reauth = self.reauth.unwrap_or_else(|| Arc::new(LogReauth));
        let refresh = RefreshCoordinator::new(
            refresher,
            self.credentials.clone(),
            reauth,
            self.auth.login_path.clone(),
        );
        let errors = self
            .errors
            .unwrap_or_else(|| ErrorHandler::new(Arc::new(ErrorMonitor::default())));

        RequestPipeline {
            transport: self.transport,
            credentials: self.credentials,
            refresh,
            errors,
            fallbacks: self.fallbacks,
            retry: self.retry,
            retryable: self.recovery.retryable,
            fallback_eligible: self.recovery.fallback,
            development_mode: self.development_mode,
            cancel: self.cancel,
        }
    }
}
