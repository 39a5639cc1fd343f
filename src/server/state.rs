//! Shared server state.
//!
//! One `ServerState` aggregate is created per server and handed mutably
//! to every bootstrap stage in pipeline order. Stages are strictly
//! sequential, so no stage-level locking exists: the state has a single
//! writer for the whole bootstrap.

use std::sync::Arc;

use dashmap::DashMap;
use semver::Version;

use crate::assets::UiAssets;
use crate::config::{ChassisConfig, ConfigError, Settings};
use crate::plugins::{PluginRegistry, PluginSet};
use crate::server::status::StatusShared;
use crate::shutdown::ShutdownCoordinator;
use crate::transport::{HttpTransport, TransportError};

/// The mutable aggregate threaded through the bootstrap pipeline.
pub struct ServerState {
    /// Raw construction-time settings, consumed by the config stage.
    pub settings: Settings,

    /// The host application version plugins are checked against.
    pub host_version: Version,

    /// Discovered plugin descriptors, built and narrowed across three stages.
    pub plugins: PluginRegistry,

    /// Cleanup callbacks run in reverse order at close.
    pub shutdown: ShutdownCoordinator,

    /// Opaque handle produced by the asset stage.
    pub ui_assets: Option<UiAssets>,

    pub(crate) plugin_set: PluginSet,
    pub(crate) status: Arc<StatusShared>,
    config: Option<Arc<ChassisConfig>>,
    sealed: bool,
    transport: Option<Arc<HttpTransport>>,
    capabilities: Arc<DashMap<String, serde_json::Value>>,
}

impl ServerState {
    pub fn new(settings: Settings, plugin_set: PluginSet) -> Self {
        let host_version = Version::parse(env!("CARGO_PKG_VERSION"))
            .expect("crate version is valid semver");
        let status = Arc::new(StatusShared::new(host_version.clone()));
        Self {
            settings,
            host_version,
            plugins: PluginRegistry::new(),
            shutdown: ShutdownCoordinator::new(),
            ui_assets: None,
            plugin_set,
            status,
            config: None,
            sealed: false,
            transport: None,
            capabilities: Arc::new(DashMap::new()),
        }
    }

    /// The resolved configuration. Errors before the config stage runs.
    pub fn config(&self) -> Result<Arc<ChassisConfig>, ConfigError> {
        self.config.clone().ok_or(ConfigError::Unresolved)
    }

    /// Replace the configuration. Errors once the config is sealed.
    pub fn set_config(&mut self, config: ChassisConfig) -> Result<(), ConfigError> {
        if self.sealed {
            return Err(ConfigError::Sealed);
        }
        self.config = Some(Arc::new(config));
        Ok(())
    }

    /// Freeze the configuration for the rest of the server's life.
    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn sealed(&self) -> bool {
        self.sealed
    }

    /// The transport. Errors before the transport stage runs.
    pub fn transport(&self) -> Result<Arc<HttpTransport>, TransportError> {
        self.transport.clone().ok_or(TransportError::NotConstructed)
    }

    pub(crate) fn set_transport(&mut self, transport: Arc<HttpTransport>) {
        self.transport = Some(transport);
    }

    /// Publish a named capability for other plugins and embedders.
    ///
    /// Plugins run in discovery order, so a later plugin observes
    /// everything earlier plugins registered.
    pub fn register_capability(&self, name: impl Into<String>, value: serde_json::Value) {
        self.capabilities.insert(name.into(), value);
    }

    /// Look up a capability registered during plugin initialization.
    pub fn capability(&self, name: &str) -> Option<serde_json::Value> {
        self.capabilities.get(name).map(|v| v.value().clone())
    }

    pub(crate) fn capabilities_handle(&self) -> Arc<DashMap<String, serde_json::Value>> {
        Arc::clone(&self.capabilities)
    }
}
