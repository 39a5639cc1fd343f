//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! Settings (key-path overrides, optional TOML file)
//!     → loader.rs (merge overlay & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → ChassisConfig (resolved)
//!     → sealed by the config finalization stage, immutable afterwards
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Overrides win over file values; later overrides win over earlier ones

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use schema::AssetsConfig;
pub use schema::ChassisConfig;
pub use schema::CompatibilityPolicy;
pub use schema::PluginsConfig;
pub use schema::ServerConfig;
pub use settings::Settings;
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving or mutating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file or overlay did not deserialize into the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// An override key path walked through a non-table value.
    #[error("invalid override key `{path}`: {reason}")]
    Override { path: String, reason: String },

    /// Semantic validation failed; every problem is reported, not just the first.
    #[error("configuration validation failed: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),

    /// Write attempted after the finalization stage sealed the config.
    #[error("configuration is sealed and can no longer change")]
    Sealed,

    /// Read attempted before the config resolution stage ran.
    #[error("configuration has not been resolved yet")]
    Unresolved,

    /// The configured logging filter did not parse.
    #[error("invalid logging filter: {0}")]
    Logging(String),
}
