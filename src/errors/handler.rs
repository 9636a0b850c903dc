//! Classify-and-record entry point.

use std::sync::Arc;

use crate::errors::category::ErrorSeverity;
use crate::errors::classifier::classify;
use crate::errors::record::{ErrorContext, ErrorRecord};
use crate::errors::types::ApiError;
use crate::monitor::ErrorMonitor;
use crate::observability::metrics;

/// Turns raw errors into records and stores them in the monitor.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    monitor: Arc<ErrorMonitor>,
}

impl ErrorHandler {
    pub fn new(monitor: Arc<ErrorMonitor>) -> Self {
        Self { monitor }
    }

    /// Classify `error`, record it, and return the record.
    pub fn handle(
        &self,
        error: &ApiError,
        context: ErrorContext,
        user_message: Option<String>,
    ) -> Arc<ErrorRecord> {
        let (category, severity) = classify(error);
        self.store(ErrorRecord::new(error.clone(), category, severity, context, user_message))
    }

    /// Like [`handle`](Self::handle) but with a caller-chosen severity.
    pub fn handle_with_severity(
        &self,
        error: &ApiError,
        severity: ErrorSeverity,
        context: ErrorContext,
        user_message: Option<String>,
    ) -> Arc<ErrorRecord> {
        let (category, _) = classify(error);
        self.store(ErrorRecord::new(error.clone(), category, severity, context, user_message))
    }

    pub fn monitor(&self) -> &Arc<ErrorMonitor> {
        &self.monitor
    }

    fn store(&self, record: ErrorRecord) -> Arc<ErrorRecord> {
        let record = Arc::new(record);
        log_record(&record);
        metrics::record_error(record.category.as_str(), record.severity.as_str());
        self.monitor.record(record.clone());
        record
    }
}

fn log_record(record: &ErrorRecord) {
    let method = record.context.get("method").unwrap_or("-");
    let url = record.context.get("url").unwrap_or("-");
    match record.severity {
        ErrorSeverity::Critical => tracing::error!(
            id = %record.id,
            category = %record.category,
            method,
            url,
            error = %record.error.detail(),
            "Critical error recorded"
        ),
        ErrorSeverity::High => tracing::warn!(
            id = %record.id,
            category = %record.category,
            method,
            url,
            error = %record.error,
            "Error recorded"
        ),
        ErrorSeverity::Medium | ErrorSeverity::Low => tracing::debug!(
            id = %record.id,
            category = %record.category,
            method,
            url,
            error = %record.error,
            "Error recorded"
        ),
    }
}
