//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration for the server chassis.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChassisConfig {
    /// Core server settings (bind address, auto-listen, pid file).
    pub server: ServerConfig,

    /// Plugin discovery and filtering settings.
    pub plugins: PluginsConfig,

    /// UI asset settings.
    pub assets: AssetsConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,
}

/// Core server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8090"). Port 0 picks an ephemeral port.
    pub bind_address: String,

    /// Start listening automatically once bootstrap completes.
    pub auto_listen: bool,

    /// Optional pid file written during bootstrap and removed on shutdown.
    pub pid_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8090".to_string(),
            auto_listen: true,
            pid_file: None,
        }
    }
}

/// Plugin discovery and filtering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directories scanned for plugin manifests, in order.
    pub scan_dirs: Vec<PathBuf>,

    /// Per-plugin enable map. An explicit `false` disables the plugin.
    pub enabled: BTreeMap<String, bool>,

    /// How plugin versions are checked against the host version.
    pub compatibility: CompatibilityPolicy,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            scan_dirs: Vec::new(),
            enabled: BTreeMap::new(),
            compatibility: CompatibilityPolicy::Manifest,
        }
    }
}

/// Version compatibility policy for discovered plugins.
///
/// Alternative schemes (secondary version fields, feature-gated builds)
/// become new variants here rather than hard-coded checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityPolicy {
    /// The manifest's `host` range must match the host version.
    /// A manifest without a `host` range is considered compatible.
    #[default]
    Manifest,

    /// The plugin version must share the host's major and minor version.
    Exact,
}

/// UI asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory of prebuilt static assets. Unset disables the asset stage's mount.
    pub public_dir: Option<PathBuf>,

    /// Route prefix the assets are served under.
    pub mount: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            public_dir: None,
            mount: "/ui".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing filter directive (e.g., "info" or "chassis=debug,tower_http=warn").
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to expose a Prometheus scrape endpoint.
    pub enabled: bool,

    /// Bind address for the scrape endpoint.
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:9090".to_string(),
        }
    }
}
