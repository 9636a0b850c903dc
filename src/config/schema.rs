//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::errors::ErrorCategory;

/// Root configuration for the resilience layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    /// API endpoint and transport settings.
    pub client: ClientConfig,

    /// Token refresh and re-authentication endpoints.
    pub auth: AuthConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Which error categories are retried or served from fallbacks.
    pub recovery: RecoveryConfig,

    /// Error log retention.
    pub monitor: MonitorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against.
    pub base_url: String,

    /// Total time for one request/response in seconds.
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Expose full cause chains on rejected requests.
    pub development_mode: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("api-resilience/", env!("CARGO_PKG_VERSION")).to_string(),
            development_mode: false,
        }
    }
}

/// Credential refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Endpoint that exchanges the current credential for a new one.
    pub refresh_path: String,

    /// Re-authentication entry point handed to the re-auth hook.
    pub login_path: String,

    /// JSON field of the refresh response holding the new token.
    pub token_field: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/auth/refresh".to_string(),
            login_path: "/login".to_string(),
            token_field: "token".to_string(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of retry attempts.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays.
    pub exponential_base: f64,

    /// Randomize each delay to spread out synchronized clients.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

/// Recovery routing by error category.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Categories handed to the retry policy.
    pub retryable: Vec<ErrorCategory>,

    /// Categories that may be served by a registered fallback.
    pub fallback: Vec<ErrorCategory>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            retryable: vec![
                ErrorCategory::Network,
                ErrorCategory::Timeout,
                ErrorCategory::ExternalService,
            ],
            fallback: vec![
                ErrorCategory::Network,
                ErrorCategory::Timeout,
                ErrorCategory::ExternalService,
                ErrorCategory::RateLimit,
            ],
        }
    }
}

/// Error monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum records kept in the log; oldest are evicted first.
    pub capacity: usize,

    /// Critical records included in a summary.
    pub critical_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            critical_limit: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin dashboard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin dashboard.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin dashboard bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ResilienceConfig = toml::from_str("").unwrap();
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.auth.refresh_path, "/auth/refresh");
        assert_eq!(config.monitor.capacity, 1000);
        assert!(config.recovery.retryable.contains(&ErrorCategory::Timeout));
        assert!(!config.recovery.retryable.contains(&ErrorCategory::RateLimit));
        assert!(config.recovery.fallback.contains(&ErrorCategory::RateLimit));
    }

    #[test]
    fn test_partial_sections() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            [client]
            base_url = "https://api.example.com/v2"
            development_mode = true

            [retries]
            max_attempts = 5

            [recovery]
            retryable = ["network", "rate_limit"]
            "#,
        )
        .unwrap();

        assert_eq!(config.client.base_url, "https://api.example.com/v2");
        assert!(config.client.development_mode);
        assert_eq!(config.client.request_timeout_secs, 30);
        assert_eq!(config.retries.max_attempts, 5);
        assert_eq!(config.retries.base_delay_ms, 1000);
        assert_eq!(
            config.recovery.retryable,
            vec![ErrorCategory::Network, ErrorCategory::RateLimit]
        );
        assert_eq!(config.recovery.fallback.len(), 4);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result: Result<ResilienceConfig, _> = toml::from_str(
            r#"
            [recovery]
            fallback = ["gremlins"]
            "#,
        );
        assert!(result.is_err());
    }
}
