//! Bootstrap pipeline.
//!
//! # Data Flow
//! ```text
//! Server::ready()
//!     → Pipeline::run(default_stages(), &mut ServerState)
//!     → each Stage awaited strictly in sequence
//!     → first failure aborts; later stages never run
//! ```
//!
//! # Design Decisions
//! - Stages never run concurrently: server state has a single writer
//!   during bootstrap, so no locking inside stages
//! - The pipeline performs no retries; polling behavior belongs inside an
//!   individual stage when its contract calls for it
//! - A failed run is not resumable: callers build a fresh server

pub mod stages;

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tracing::Instrument;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::observability::metrics;
use crate::plugins::{DiscoveryError, PluginError};
use crate::server::ServerState;
use crate::transport::TransportError;

/// Outcome of one stage run.
pub type StageResult = Result<(), StageError>;

/// Future returned by a stage body; borrows the shared server state.
pub type StageFuture<'a> = BoxFuture<'a, StageResult>;

/// Any failure a stage can produce.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pipeline failure, carrying the identity of the stage that failed.
///
/// Cloneable so every concurrent `ready()` caller can observe the same
/// outcome; the underlying stage error is shared.
#[derive(Debug, Clone, Error)]
#[error("bootstrap stage `{stage}` failed: {cause}")]
pub struct BootstrapError {
    pub stage: &'static str,
    pub cause: Arc<StageError>,
}

/// One named unit of bootstrap work with a defined effect on server state.
pub struct Stage {
    name: &'static str,
    body: Box<dyn for<'a> Fn(&'a mut ServerState) -> StageFuture<'a> + Send + Sync>,
}

impl Stage {
    pub fn new<F>(name: &'static str, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut ServerState) -> StageFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name,
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) async fn run(&self, state: &mut ServerState) -> StageResult {
        (self.body)(state).await
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// Ordered sequence of stages executed during bootstrap.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Run every stage in order against the shared state.
    ///
    /// Each stage is awaited to completion before the next begins. The
    /// first failure stops the pipeline and is returned with the failing
    /// stage's name; later stages never execute.
    pub async fn run(&self, state: &mut ServerState) -> Result<(), BootstrapError> {
        for stage in &self.stages {
            let started = Instant::now();
            let span = tracing::info_span!("bootstrap_stage", stage = stage.name());
            let result = stage.run(state).instrument(span).await;
            let elapsed = started.elapsed();
            metrics::record_stage(stage.name(), elapsed, result.is_ok());

            match result {
                Ok(()) => {
                    tracing::debug!(stage = stage.name(), ?elapsed, "stage complete");
                }
                Err(cause) => {
                    tracing::error!(stage = stage.name(), error = %cause, "bootstrap stage failed");
                    return Err(BootstrapError {
                        stage: stage.name(),
                        cause: Arc::new(cause),
                    });
                }
            }
        }
        Ok(())
    }
}
