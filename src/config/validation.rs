//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, delays ordered, capacity > 0)
//! - Check that URLs, paths and bind addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ResilienceConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: path '{value}' must start with '/'")]
    InvalidPath { field: &'static str, value: String },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: {message}")]
    OutOfRange { field: &'static str, message: String },

    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Check `config` for semantic errors, collecting all of them.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.client.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidUrl {
            field: "client.base_url",
            value: config.client.base_url.clone(),
        }),
    }
    if config.client.request_timeout_secs == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "client.request_timeout_secs",
            message: "must be greater than 0".into(),
        });
    }

    for (field, value) in [
        ("auth.refresh_path", &config.auth.refresh_path),
        ("auth.login_path", &config.auth.login_path),
    ] {
        if !value.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                field,
                value: value.clone(),
            });
        }
    }
    if config.auth.token_field.trim().is_empty() {
        errors.push(ValidationError::Invalid {
            field: "auth.token_field",
            message: "must not be empty".into(),
        });
    }

    let retries = &config.retries;
    if retries.max_attempts < 1 {
        errors.push(ValidationError::OutOfRange {
            field: "retries.max_attempts",
            message: "must be at least 1".into(),
        });
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::OutOfRange {
            field: "retries.base_delay_ms",
            message: format!(
                "{} exceeds retries.max_delay_ms ({})",
                retries.base_delay_ms, retries.max_delay_ms
            ),
        });
    }
    if !retries.exponential_base.is_finite() || retries.exponential_base < 1.0 {
        errors.push(ValidationError::OutOfRange {
            field: "retries.exponential_base",
            message: "must be a finite number >= 1.0".into(),
        });
    }

    if config.monitor.capacity == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "monitor.capacity",
            message: "must be greater than 0".into(),
        });
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::Invalid {
            field: "observability.log_format",
            message: format!("unknown format '{}', expected 'pretty' or 'json'", observability.log_format),
        });
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Invalid {
                field: "admin.api_key",
                message: "must not be empty when the dashboard is enabled".into(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
