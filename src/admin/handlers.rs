use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::admin::AdminState;
use crate::errors::ErrorRecord;
use crate::monitor::MonitorSummary;

/// Records returned by `/admin/errors/recent` when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub base_url: String,
    pub retained_errors: usize,
    pub monitor_capacity: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn get_status(
    State(state): State<AdminState>,
) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        base_url: state.base_url.to_string(),
        retained_errors: state.monitor.len(),
        monitor_capacity: state.monitor.capacity(),
    })
}

pub async fn get_errors(
    State(state): State<AdminState>,
) -> Json<MonitorSummary> {
    Json(state.monitor.summary())
}

pub async fn get_recent_errors(
    State(state): State<AdminState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<Arc<ErrorRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.monitor.recent(limit))
}

pub async fn clear_errors(
    State(state): State<AdminState>,
) -> StatusCode {
    let cleared = state.monitor.len();
    state.monitor.clear();
    tracing::info!(cleared, "Error log cleared via admin API");
    StatusCode::NO_CONTENT
}
