//! Error taxonomy subsystem.
//!
//! # Data Flow
//! ```text
//! ApiError (transport or application)
//!     → classifier.rs (category + default severity)
//!     → record.rs (immutable ErrorRecord with context)
//!     → handler.rs (log, count, append to monitor)
//! ```
//!
//! # Design Decisions
//! - Classification is a pure function; it never fails
//! - Severity is advisory and never drives recovery
//! - Cause chains stay out of user-facing text

pub mod category;
pub mod classifier;
pub mod handler;
pub mod record;
pub mod types;

pub use category::{ErrorCategory, ErrorSeverity};
pub use classifier::classify;
pub use handler::ErrorHandler;
pub use record::{user_message, ErrorContext, ErrorRecord};
pub use types::{ApiError, ApiResult};
