//! Error taxonomy: categories, severities and the user-facing message table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Authentication,
    Authorization,
    Validation,
    ExternalService,
    Internal,
    Timeout,
    RateLimit,
}

impl ErrorCategory {
    /// All categories, in declaration order.
    pub const ALL: [ErrorCategory; 8] = [
        ErrorCategory::Network,
        ErrorCategory::Authentication,
        ErrorCategory::Authorization,
        ErrorCategory::Validation,
        ErrorCategory::ExternalService,
        ErrorCategory::Internal,
        ErrorCategory::Timeout,
        ErrorCategory::RateLimit,
    ];

    /// Stable snake_case name, used for metric labels and monitor keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Validation => "validation",
            ErrorCategory::ExternalService => "external_service",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimit => "rate_limit",
        }
    }

    /// Severity assigned at classification time.
    pub fn default_severity(&self) -> ErrorSeverity {
        match self {
            ErrorCategory::Network => ErrorSeverity::High,
            ErrorCategory::Authentication => ErrorSeverity::Medium,
            ErrorCategory::Authorization => ErrorSeverity::Medium,
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::ExternalService => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Medium,
            ErrorCategory::Timeout => ErrorSeverity::High,
            ErrorCategory::RateLimit => ErrorSeverity::Medium,
        }
    }

    /// Message shown to end users when no explicit message was supplied.
    pub fn default_user_message(&self) -> &'static str {
        match self {
            ErrorCategory::Network => {
                "Unable to connect to the server. Please check your connection and try again."
            }
            ErrorCategory::Authentication => "Your session has expired. Please sign in again.",
            ErrorCategory::Authorization => "You do not have permission to perform this action.",
            ErrorCategory::Validation => "Some of the provided information is invalid. Please review it and try again.",
            ErrorCategory::ExternalService => {
                "A service we depend on is temporarily unavailable. Please try again later."
            }
            ErrorCategory::Internal => "Something went wrong. Please try again.",
            ErrorCategory::Timeout => "The request took too long to complete. Please try again.",
            ErrorCategory::RateLimit => "Too many requests. Please wait a moment and try again.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown error category '{}'", s))
    }
}

/// Advisory severity; informs log level and dashboards, never recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
