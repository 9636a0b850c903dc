//! Error classification.
//!
//! Maps an [`ApiError`] onto exactly one [`ErrorCategory`] plus its default
//! severity. Rules are evaluated in a fixed order and the first match wins:
//!
//! ```text
//! no response + network keyword   → network
//! transport error + no response   → network
//! 401 / auth keyword              → authentication
//! 403 / permission keyword        → authorization
//! 400 / validation keyword        → validation
//! external/service/api keyword    → external_service
//! status >= 500                   → external_service
//! timeout keyword / timeout flag  → timeout
//! 429 / rate-limit keyword        → rate_limit
//! otherwise                       → internal
//! ```

use crate::errors::category::{ErrorCategory, ErrorSeverity};
use crate::errors::types::ApiError;

const NETWORK_KEYWORDS: &[&str] = &["network", "connection", "timeout", "fetch failed"];
const AUTHENTICATION_KEYWORDS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "authentication",
    "invalid token",
    "token expired",
];
const AUTHORIZATION_KEYWORDS: &[&str] = &["forbidden", "permission", "access denied", "not allowed"];
const VALIDATION_KEYWORDS: &[&str] = &["validation", "invalid input", "is required", "malformed"];
const EXTERNAL_KEYWORDS: &[&str] = &["external", "service", "api"];
const TIMEOUT_KEYWORDS: &[&str] = &["timed out", "timeout", "deadline exceeded"];
const RATE_LIMIT_KEYWORDS: &[&str] = &["rate limit", "too many requests"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classify an error. Total and deterministic; never panics.
pub fn classify(error: &ApiError) -> (ErrorCategory, ErrorSeverity) {
    let category = categorize(error);
    (category, category.default_severity())
}

fn categorize(error: &ApiError) -> ErrorCategory {
    let message = error.message.to_lowercase();
    let status = error.status;

    if !error.has_response() && contains_any(&message, NETWORK_KEYWORDS) {
        return ErrorCategory::Network;
    }
    if error.from_transport && !error.has_response() {
        return ErrorCategory::Network;
    }
    if status == Some(401) || contains_any(&message, AUTHENTICATION_KEYWORDS) {
        return ErrorCategory::Authentication;
    }
    if status == Some(403) || contains_any(&message, AUTHORIZATION_KEYWORDS) {
        return ErrorCategory::Authorization;
    }
    if status == Some(400) || contains_any(&message, VALIDATION_KEYWORDS) {
        return ErrorCategory::Validation;
    }
    if contains_any(&message, EXTERNAL_KEYWORDS) {
        return ErrorCategory::ExternalService;
    }
    if status.is_some_and(|s| s >= 500) {
        return ErrorCategory::ExternalService;
    }
    if error.timed_out || contains_any(&message, TIMEOUT_KEYWORDS) {
        return ErrorCategory::Timeout;
    }
    if status == Some(429) || contains_any(&message, RATE_LIMIT_KEYWORDS) {
        return ErrorCategory::RateLimit;
    }
    ErrorCategory::Internal
}
