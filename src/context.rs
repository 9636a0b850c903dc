//! Process-wide resilience context.
//!
//! Built once at startup from a validated [`ResilienceConfig`] and passed by
//! reference. Every pipeline created from one context shares its monitor,
//! fallback registry and shutdown token.

use std::sync::Arc;

use crate::auth::CredentialStore;
use crate::config::ResilienceConfig;
use crate::errors::{ApiResult, ErrorHandler};
use crate::http::{PipelineBuilder, ReqwestTransport, RequestPipeline, Transport};
use crate::lifecycle::Shutdown;
use crate::monitor::ErrorMonitor;
use crate::resilience::{FallbackRegistry, RetryPolicy};

#[derive(Debug, Clone)]
pub struct ResilienceContext {
    config: Arc<ResilienceConfig>,
    monitor: Arc<ErrorMonitor>,
    errors: ErrorHandler,
    fallbacks: FallbackRegistry,
    retry_policy: RetryPolicy,
    shutdown: Shutdown,
}

impl ResilienceContext {
    pub fn new(config: ResilienceConfig) -> Self {
        let monitor = Arc::new(ErrorMonitor::with_limits(
            config.monitor.capacity,
            config.monitor.critical_limit,
        ));
        let retry_policy = RetryPolicy::from(&config.retries);

        tracing::debug!(
            base_url = %config.client.base_url,
            retries_enabled = config.retries.enabled,
            max_attempts = retry_policy.max_attempts,
            monitor_capacity = monitor.capacity(),
            "Resilience context initialized"
        );

        Self {
            errors: ErrorHandler::new(monitor.clone()),
            config: Arc::new(config),
            monitor,
            fallbacks: FallbackRegistry::new(),
            retry_policy,
            shutdown: Shutdown::new(),
        }
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<ErrorMonitor> {
        &self.monitor
    }

    pub fn errors(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.fallbacks
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// A pipeline builder preloaded with this context's shared parts and settings.
    pub fn pipeline_builder(
        &self,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> PipelineBuilder {
        let retry = self.config.retries.enabled.then(|| self.retry_policy.clone());
        RequestPipeline::builder(transport, credentials)
            .auth(self.config.auth.clone())
            .errors(self.errors.clone())
            .fallbacks(self.fallbacks.clone())
            .retry(retry)
            .recovery(self.config.recovery.clone())
            .development_mode(self.config.client.development_mode)
            .cancellation(self.shutdown.token())
    }

    /// A pipeline over a reqwest transport for `client.base_url`.
    pub fn http_pipeline(&self, credentials: Arc<dyn CredentialStore>) -> ApiResult<RequestPipeline> {
        let transport = Arc::new(ReqwestTransport::new(&self.config.client)?);
        Ok(self.pipeline_builder(transport, credentials).build())
    }
}
