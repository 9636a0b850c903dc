//! Credential handling and token refresh.
//!
//! # Data Flow
//! ```text
//! 401 from the API
//!     → refresh.rs (join or start the single in-flight refresh)
//!     → refresher.rs (POST to the refresh endpoint via the raw transport)
//!     → credentials.rs (store the new token, or clear on failure)
//!     → waiters released in arrival order, requests replayed
//! ```
//!
//! # Design Decisions
//! - The refresh call bypasses the pipeline so a 401 from it cannot recurse
//! - The refresh runs on its own task; callers only wait on a channel
//! - A failed refresh clears the session and calls the re-auth hook exactly once

pub mod credentials;
pub mod refresh;
pub mod refresher;

pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use refresh::{RefreshCoordinator, RefreshError, RefreshResult};
pub use refresher::{HttpTokenRefresher, LogReauth, ReauthHandler, TokenRefresher};
