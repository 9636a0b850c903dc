//! Retry policy.
//!
//! # Responsibilities
//! - Run an async operation up to `max_attempts` times
//! - Sleep with exponential backoff + jitter between attempts
//! - Let callers abort a pending backoff via a cancellation token
//!
//! # Design Decisions
//! - The policy never classifies errors; callers decide whether to use it
//! - Attempts of one call are strictly sequential
//! - The policy is immutable; attempt state lives in the call

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{apply_jitter, calculate_backoff};

/// Failure of a cancellable retry run.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The final attempt failed.
    #[error("{0}")]
    Failed(E),

    /// The token fired before the next attempt could start.
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last_error: Option<E> },
}

/// Bounded retries with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            exponential_base: config.exponential_base,
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows attempt `attempt_index` (zero-based).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let delay = calculate_backoff(attempt_index, self.base_delay, self.max_delay, self.exponential_base);
        if self.jitter {
            apply_jitter(delay)
        } else {
            delay
        }
    }

    /// Run `operation` until it succeeds or attempts run out.
    ///
    /// Returns the error of the last attempt on exhaustion.
    pub async fn execute<F, Fut, T, E>(&self, context: &str, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run(
            context,
            operation,
            |delay, _, _| async move {
                tokio::time::sleep(delay).await;
                Ok::<(), E>(())
            },
            |err| err,
        )
        .await
    }

    /// Like [`execute`](Self::execute), but a fired `token` aborts the backoff wait.
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        context: &str,
        token: &CancellationToken,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if token.is_cancelled() {
            return Err(RetryError::Cancelled { attempts: 0, last_error: None });
        }

        self.run(
            context,
            operation,
            |delay, attempts, err| async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!(context, attempts, "Retry cancelled during backoff");
                        Err(RetryError::Cancelled { attempts, last_error: Some(err) })
                    }
                    _ = tokio::time::sleep(delay) => Ok(()),
                }
            },
            RetryError::Failed,
        )
        .await
    }

    /// Shared attempt loop.
    ///
    /// `wait` sleeps out a backoff and may end the run early with its own error;
    /// `exhausted` maps the final attempt's error into the run's error type.
    async fn run<F, Fut, T, E, W, WFut, R>(
        &self,
        context: &str,
        mut operation: F,
        mut wait: W,
        exhausted: impl FnOnce(E) -> R,
    ) -> Result<T, R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        W: FnMut(Duration, u32, E) -> WFut,
        WFut: Future<Output = Result<(), R>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(context, attempts = attempt + 1, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt + 1 >= max_attempts {
                tracing::warn!(context, attempts = max_attempts, error = %err, "Retry attempts exhausted");
                return Err(exhausted(err));
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                context,
                attempt = attempt + 1,
                max_attempts,
                delay = ?delay,
                error = %err,
                "Attempt failed, retrying"
            );
            metrics::record_retry_attempt();

            wait(delay, attempt + 1, err).await?;
            attempt += 1;
        }
    }
}
