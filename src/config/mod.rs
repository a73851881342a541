//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BffConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the service runs with no file at all
//! - Backend URLs missing from the file are read from the environment per request

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, validate_config_or_err, ConfigError};
pub use schema::BffConfig;
pub use schema::DownstreamConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::PropagationStyle;
pub use schema::TracingConfig;
