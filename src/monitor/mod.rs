//! Error monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! ErrorHandler::handle
//!     → log.rs (append to bounded FIFO log, bump per-key counter)
//!     → summary.rs (aggregates computed on demand)
//!     → admin dashboard / CLI output
//! ```
//!
//! # Design Decisions
//! - Fixed capacity, oldest record evicted first
//! - The 24h window is evaluated at query time, not maintained incrementally
//! - The log sits behind a mutex that is never held across an await

pub mod log;
pub mod summary;

pub use log::{ErrorMonitor, DEFAULT_CAPACITY, RECENT_WINDOW};
pub use summary::MonitorSummary;
