//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ResilienceConfig (validated, immutable)
//!     → ResilienceContext builds every component from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ResilienceConfig;
pub use schema::{AdminConfig, AuthConfig, ClientConfig, MonitorConfig};
pub use schema::{ObservabilityConfig, RecoveryConfig, RetryConfig};
pub use validation::{validate_config, ValidationError};
