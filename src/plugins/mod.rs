//! Plugin discovery, filtering, and initialization.
//!
//! # Data Flow
//! ```text
//! plugins.scan_dirs
//!     → scan.rs (one descriptor per plugin.toml, duplicate ids are fatal)
//!     → filter.rs check_enabled (config disable map + hard-dependency check)
//!     → filter.rs check_version (semver compatibility, non-fatal exclusion)
//!     → initialization stage runs the survivors' init callbacks in
//!       discovery order against the shared server state
//! ```
//!
//! # Design Decisions
//! - Manifests on disk carry metadata only; init callbacks are supplied
//!   in-process through a `PluginSet` keyed by plugin id
//! - A descriptor that is disabled or incompatible never has its init run
//! - Incompatibility is a recorded diagnostic, not a pipeline failure

pub mod filter;
pub mod scan;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::ServerState;

/// Error type plugin init callbacks may return.
pub type PluginInitError = Box<dyn std::error::Error + Send + Sync>;

/// Deferred plugin initialization callback.
///
/// Receives the shared server state so a plugin can register capabilities,
/// add transport routes, or hook shutdown cleanup.
pub type InitFn = Arc<
    dyn for<'a> Fn(&'a mut ServerState) -> BoxFuture<'a, Result<(), PluginInitError>>
        + Send
        + Sync,
>;

/// Errors raised while discovering plugins.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to scan plugin directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid plugin manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("duplicate plugin id `{id}` (found at {} and {})", .first.display(), .second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("plugin `{id}` at {} has no registered init function", .path.display())]
    Unresolvable { id: String, path: PathBuf },
}

/// Fatal plugin errors surfaced through the bootstrap pipeline.
#[derive(Debug, Error)]
pub enum PluginError {
    /// An enabled plugin hard-requires a plugin that is missing or disabled.
    #[error("plugin `{dependent}` requires plugin `{required}`, which {reason}")]
    Dependency {
        dependent: String,
        required: String,
        reason: String,
    },

    /// A plugin's own init callback failed.
    #[error("plugin `{id}` failed to initialize: {cause}")]
    Init { id: String, cause: PluginInitError },
}

/// Plugin metadata parsed from a `plugin.toml` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin id.
    pub id: String,

    /// The plugin's own semantic version.
    pub version: Version,

    /// Host version range this plugin is compatible with.
    #[serde(default)]
    pub host: Option<VersionReq>,

    /// Hard dependencies: ids that must be present and enabled.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Soft dependencies: used when present, skipped silently otherwise.
    #[serde(default)]
    pub optional: Vec<String>,
}

/// One discovered plugin and its filtering status.
pub struct PluginDescriptor {
    pub id: String,
    pub version: Version,
    pub path: PathBuf,
    pub enabled: bool,
    pub compatible: bool,
    /// Diagnostic recorded when the version filter excludes the plugin.
    pub incompatibility: Option<String>,
    pub requires: Vec<String>,
    pub optional: Vec<String>,
    pub(crate) host_req: Option<VersionReq>,
    init: InitFn,
}

impl PluginDescriptor {
    pub(crate) fn from_manifest(manifest: PluginManifest, path: PathBuf, init: InitFn) -> Self {
        Self {
            id: manifest.id,
            version: manifest.version,
            path,
            enabled: true,
            compatible: true,
            incompatibility: None,
            requires: manifest.requires,
            optional: manifest.optional,
            host_req: manifest.host,
            init,
        }
    }

    /// True when the descriptor survived both filtering stages.
    pub fn active(&self) -> bool {
        self.enabled && self.compatible
    }

    pub(crate) fn init_fn(&self) -> InitFn {
        Arc::clone(&self.init)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("path", &self.path)
            .field("enabled", &self.enabled)
            .field("compatible", &self.compatible)
            .field("incompatibility", &self.incompatibility)
            .finish_non_exhaustive()
    }
}

/// Reporting view of one descriptor, served by the status route.
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub id: String,
    pub version: String,
    pub enabled: bool,
    pub compatible: bool,
    pub reason: Option<String>,
}

/// In-process registry of plugin init callbacks, keyed by id.
///
/// Discovery pairs each on-disk manifest with its init callback from this
/// set; a manifest without a matching entry is unresolvable.
#[derive(Clone, Default)]
pub struct PluginSet {
    inits: HashMap<String, InitFn>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an init callback for a plugin id. Builder-style.
    pub fn register<F>(mut self, id: impl Into<String>, init: F) -> Self
    where
        F: for<'a> Fn(&'a mut ServerState) -> BoxFuture<'a, Result<(), PluginInitError>>
            + Send
            + Sync
            + 'static,
    {
        self.inits.insert(id.into(), Arc::new(init));
        self
    }

    pub(crate) fn get(&self, id: &str) -> Option<InitFn> {
        self.inits.get(id).map(Arc::clone)
    }
}

#[cfg(test)]
pub(crate) fn noop_init() -> InitFn {
    fn noop(_state: &mut ServerState) -> BoxFuture<'_, Result<(), PluginInitError>> {
        Box::pin(async { Ok(()) })
    }
    Arc::new(noop)
}

/// Ordered collection of discovered plugin descriptors.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor, rejecting duplicate ids.
    pub fn insert(&mut self, descriptor: PluginDescriptor) -> Result<(), DiscoveryError> {
        if let Some(existing) = self.plugins.iter().find(|p| p.id == descriptor.id) {
            return Err(DiscoveryError::DuplicateId {
                id: descriptor.id.clone(),
                first: existing.path.clone(),
                second: descriptor.path,
            });
        }
        self.plugins.push(descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PluginDescriptor> {
        self.plugins.iter_mut()
    }

    /// Descriptors that survived both filters, in discovery order.
    pub fn active(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter().filter(|p| p.active())
    }

    /// Reporting snapshot for the status route.
    pub fn statuses(&self) -> Vec<PluginStatus> {
        self.plugins
            .iter()
            .map(|p| PluginStatus {
                id: p.id.clone(),
                version: p.version.to_string(),
                enabled: p.enabled,
                compatible: p.compatible,
                reason: p.incompatibility.clone(),
            })
            .collect()
    }
}
