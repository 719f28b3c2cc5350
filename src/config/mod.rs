//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, status names normalized)
//!     → validation.rs (patterns compiled, addresses checked)
//!     → RedirectorConfig (validated, immutable)
//!     → RedirectOptions shared via Arc with the resolver
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; rules added later go through the
//!   resolver's registration, never through the config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, ObservabilityConfig, RedirectMode, RedirectOptions,
    RedirectorConfig, TimeoutConfig,
};
