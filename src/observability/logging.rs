//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - The subscriber installs once at process start; the bootstrap
//!   logging stage swaps the filter through a reload handle instead of
//!   re-initializing
//! - When no subscriber was installed through `init` (tests, embedders
//!   with their own subscriber), applying a filter is a quiet no-op

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter};

use crate::config::ConfigError;

static RELOAD: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber with an environment-overridable filter.
///
/// `RUST_LOG` wins over `default_filter`. Safe to call once per process;
/// later calls are ignored.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_target(true));

    if subscriber.try_init().is_ok() {
        let _ = RELOAD.set(handle);
    }
}

/// Apply a configured filter through the reload handle.
pub fn apply(filter: &str) -> Result<(), ConfigError> {
    let Some(handle) = RELOAD.get() else {
        tracing::debug!("no reload handle installed, keeping current filter");
        return Ok(());
    };

    let parsed = EnvFilter::try_new(filter).map_err(|e| ConfigError::Logging(e.to_string()))?;
    handle
        .reload(parsed)
        .map_err(|e| ConfigError::Logging(e.to_string()))?;
    tracing::debug!(filter = %filter, "logging filter applied");
    Ok(())
}
