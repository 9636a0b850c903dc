//! Admin dashboard over the error monitor.
//!
//! All routes require `Authorization: Bearer <admin.api_key>`.

pub mod handlers;
pub mod auth;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::get,
    Router,
    middleware,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::context::ResilienceContext;
use crate::lifecycle::Shutdown;
use crate::monitor::ErrorMonitor;
use self::handlers::*;
use self::auth::admin_auth_middleware;

/// Shared state of the admin routes.
#[derive(Clone)]
pub struct AdminState {
    pub monitor: Arc<ErrorMonitor>,
    pub api_key: Arc<str>,
    pub base_url: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(context: &ResilienceContext) -> Self {
        let config = context.config();
        Self {
            monitor: context.monitor().clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
            base_url: Arc::from(config.client.base_url.as_str()),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/errors", get(get_errors).delete(clear_errors))
        .route("/admin/errors/recent", get(get_recent_errors))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin dashboard on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, state: AdminState, shutdown: Shutdown) -> std::io::Result<()> {
    let address = listener.local_addr()?;
    tracing::info!(address = %address, "Admin dashboard listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("Admin dashboard stopped");
    Ok(())
}
