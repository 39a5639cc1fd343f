//! Construction-time settings overlay.
//!
//! Settings are the raw, unresolved input handed to the orchestrator:
//! an optional config file plus an ordered list of dotted key-path
//! overrides. Resolution into a [`ChassisConfig`](super::ChassisConfig)
//! happens inside the bootstrap pipeline's config stage, not here.

use std::path::PathBuf;

/// Unresolved configuration input.
///
/// Overrides are applied on top of the file contents in insertion order,
/// so a later `set` for the same key wins.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    file: Option<PathBuf>,
    overrides: Vec<(String, toml::Value)>,
}

impl Settings {
    /// Empty settings: defaults for everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings backed by a TOML config file.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            overrides: Vec::new(),
        }
    }

    /// Add a dotted key-path override, e.g. `set("server.auto_listen", false)`.
    pub fn set(mut self, path: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.overrides.push((path.into(), value.into()));
        self
    }

    pub fn file(&self) -> Option<&PathBuf> {
        self.file.as_ref()
    }

    pub fn overrides(&self) -> &[(String, toml::Value)] {
        &self.overrides
    }
}
