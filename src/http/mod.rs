//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! Application code
//!     → request.rs (ApiRequest with request ID, headers, body)
//!     → pipeline.rs (attach credential, recover on failure)
//!     → transport.rs (reqwest call against the base URL)
//!     → ApiResponse tagged with its origin
//! ```

pub mod pipeline;
pub mod request;
pub mod transport;

pub use pipeline::{PipelineBuilder, PipelineError, RequestPipeline};
pub use request::{ApiRequest, ApiResponse, ResponseOrigin, X_REQUEST_ID};
pub use transport::{ReqwestTransport, Transport};
