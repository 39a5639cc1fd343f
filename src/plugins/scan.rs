//! Plugin discovery.
//!
//! # Responsibilities
//! - Walk each configured scan directory
//! - Parse `plugin.toml` manifests into descriptors
//! - Pair manifests with their registered init callbacks
//! - Reject duplicate plugin ids across all scan dirs
//!
//! # Design Decisions
//! - Directory entries are visited in name order so discovery order is
//!   deterministic across platforms
//! - A directory without a manifest is skipped, not an error

use std::fs;
use std::path::{Path, PathBuf};

use crate::plugins::{DiscoveryError, PluginDescriptor, PluginManifest, PluginRegistry, PluginSet};

const MANIFEST_NAME: &str = "plugin.toml";

/// Scan the configured directories and build the plugin registry.
pub fn discover(
    scan_dirs: &[PathBuf],
    plugin_set: &PluginSet,
) -> Result<PluginRegistry, DiscoveryError> {
    let mut registry = PluginRegistry::new();

    for dir in scan_dirs {
        for entry in sorted_entries(dir)? {
            let manifest_path = entry.join(MANIFEST_NAME);
            if !manifest_path.is_file() {
                continue;
            }

            let manifest = read_manifest(&manifest_path)?;
            let init = plugin_set
                .get(&manifest.id)
                .ok_or_else(|| DiscoveryError::Unresolvable {
                    id: manifest.id.clone(),
                    path: entry.clone(),
                })?;

            tracing::debug!(
                plugin = %manifest.id,
                version = %manifest.version,
                path = %entry.display(),
                "discovered plugin"
            );

            registry.insert(PluginDescriptor::from_manifest(manifest, entry, init))?;
        }
    }

    tracing::info!(count = registry.len(), "plugin scan complete");
    Ok(registry)
}

fn read_manifest(path: &Path) -> Result<PluginManifest, DiscoveryError> {
    let content = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| DiscoveryError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

/// Child directories of `dir`, sorted by name.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
