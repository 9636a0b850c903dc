//! Monitor summary shape, served as JSON by the admin dashboard.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ErrorCategory, ErrorRecord, ErrorSeverity};

#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    /// Records currently retained in the log.
    pub total_errors: usize,
    /// Retained records newer than 24 hours at query time.
    pub recent_errors_24h: usize,
    /// Lifetime occurrences per `category:message` key.
    pub counts_by_key: HashMap<String, u64>,
    pub counts_by_category: HashMap<ErrorCategory, u64>,
    pub counts_by_severity: HashMap<ErrorSeverity, u64>,
    /// Most recent critical records, oldest first.
    pub recent_critical_errors: Vec<Arc<ErrorRecord>>,
}
