//! Client-side HTTP resilience layer.
//!
//! Wraps outbound API calls with error classification, a bounded error
//! monitor, single-flight credential refresh, retry with backoff and
//! registered fallbacks.

pub mod admin;
pub mod auth;
pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod resilience;

pub use config::schema::ResilienceConfig;
pub use context::ResilienceContext;
pub use errors::{classify, user_message, ApiError, ErrorCategory, ErrorHandler, ErrorRecord, ErrorSeverity};
pub use http::{ApiRequest, ApiResponse, PipelineError, RequestPipeline, ResponseOrigin};
pub use lifecycle::Shutdown;
