//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed request (retryable category):
//!     → retries.rs (re-run with exponential backoff, bounded attempts)
//!     → backoff.rs (delay per attempt, optional jitter)
//! Retries exhausted or fallback-eligible category:
//!     → fallback.rs (substitute response keyed by "METHOD path")
//! ```
//!
//! # Design Decisions
//! - Retry runs before fallback; neither classifies errors itself
//! - Backoff waits are cancellable so shutdown is never held up
//! - Fallback handlers are registered at runtime and shared across pipelines

pub mod backoff;
pub mod fallback;
pub mod retries;

pub use backoff::{apply_jitter, calculate_backoff};
pub use fallback::{fallback_key, FallbackError, FallbackRegistry};
pub use retries::{RetryError, RetryPolicy};
