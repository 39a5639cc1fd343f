//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and route mounts
//! - Catch problems before any stage with side effects runs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ChassisConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ChassisConfig;

/// One semantic problem with a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.bind_address `{0}` is not a valid socket address")]
    BindAddress(String),

    #[error("metrics.bind_address `{0}` is not a valid socket address")]
    MetricsAddress(String),

    #[error("assets.mount `{0}` must start with '/'")]
    AssetMount(String),

    #[error("plugins.scan_dirs contains an empty path")]
    EmptyScanDir,
}

/// Validate a resolved configuration, collecting every error.
pub fn validate_config(config: &ChassisConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.server.bind_address.clone(),
        ));
    }

    if config.metrics.enabled && config.metrics.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(
            config.metrics.bind_address.clone(),
        ));
    }

    if !config.assets.mount.starts_with('/') {
        errors.push(ValidationError::AssetMount(config.assets.mount.clone()));
    }

    if config.plugins.scan_dirs.iter().any(|p| p.as_os_str().is_empty()) {
        errors.push(ValidationError::EmptyScanDir);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
