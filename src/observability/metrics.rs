//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resilience metrics (errors, retries, refreshes, fallbacks)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `resilience_errors_total` (counter): recorded errors by category, severity
//! - `resilience_retry_attempts_total` (counter): retries scheduled
//! - `resilience_token_refresh_total` (counter): refresh calls by outcome
//! - `resilience_fallback_total` (counter): fallback lookups by outcome
//! - `resilience_requests_total` (counter): terminal request outcomes by origin
//! - `resilience_monitor_log_size` (gauge): records currently retained
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are low-cardinality strings only

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_error(category: &'static str, severity: &'static str) {
    counter!("resilience_errors_total", "category" => category, "severity" => severity).increment(1);
}

pub fn record_retry_attempt() {
    counter!("resilience_retry_attempts_total").increment(1);
}

pub fn record_token_refresh(outcome: &'static str) {
    counter!("resilience_token_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_fallback(outcome: &'static str) {
    counter!("resilience_fallback_total", "outcome" => outcome).increment(1);
}

pub fn record_request(origin: &'static str) {
    counter!("resilience_requests_total", "origin" => origin).increment(1);
}

pub fn record_monitor_size(size: usize) {
    gauge!("resilience_monitor_log_size").set(size as f64);
}
