//! Immutable error records.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

use crate::errors::category::{ErrorCategory, ErrorSeverity};
use crate::errors::types::ApiError;

/// Key/value context attached to a record (method, url, status, caller tags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext(BTreeMap<String, String>);

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tag.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A classified error. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub error: ApiError,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub context: ErrorContext,
    pub user_message: Option<String>,
    pub timestamp: SystemTime,
}

impl ErrorRecord {
    pub fn new(
        error: ApiError,
        category: ErrorCategory,
        severity: ErrorSeverity,
        context: ErrorContext,
        user_message: Option<String>,
    ) -> Self {
        Self::at(error, category, severity, context, user_message, SystemTime::now())
    }

    /// Create a record with an explicit timestamp.
    pub fn at(
        error: ApiError,
        category: ErrorCategory,
        severity: ErrorSeverity,
        context: ErrorContext,
        user_message: Option<String>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            error,
            category,
            severity,
            context,
            user_message,
            timestamp,
        }
    }

    /// Aggregation key used by the monitor's per-key counters.
    pub fn key(&self) -> String {
        format!("{}:{}", self.category, self.error.message)
    }

    /// Text safe to show end users. Prefers the caller-supplied message.
    pub fn user_message(&self) -> String {
        user_message(self)
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.error)
    }
}

/// Resolve the user-facing message for a record.
///
/// The explicit message wins; otherwise the category's fixed message is used.
/// Never includes the cause chain.
pub fn user_message(record: &ErrorRecord) -> String {
    record
        .user_message
        .clone()
        .unwrap_or_else(|| record.category.default_user_message().to_string())
}
