//! Status reporting surface.
//!
//! The status stage registers `/status` early in bootstrap; the data it
//! serves is updated as later stages learn more (plugin filtering) and
//! as the lifecycle controller moves through phases.

use std::sync::{Arc, RwLock};

use arc_swap::ArcSwap;
use semver::Version;
use serde::Serialize;

use crate::plugins::PluginStatus;
use crate::server::Phase;

/// Live data behind the `/status` route.
pub struct StatusShared {
    version: Version,
    pub(crate) phase: Arc<ArcSwap<Phase>>,
    plugins: RwLock<Vec<PluginStatus>>,
}

/// Serialized body of a `/status` response.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub name: &'static str,
    pub version: String,
    pub phase: String,
    pub plugins: Vec<PluginStatus>,
}

impl StatusShared {
    pub(crate) fn new(version: Version) -> Self {
        Self {
            version,
            phase: Arc::new(ArcSwap::from_pointee(Phase::Constructed)),
            plugins: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn set_plugins(&self, statuses: Vec<PluginStatus>) {
        if let Ok(mut guard) = self.plugins.write() {
            *guard = statuses;
        }
    }

    pub fn snapshot(&self) -> StatusBody {
        let plugins = self
            .plugins
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        StatusBody {
            name: "chassis",
            version: self.version.to_string(),
            phase: (**self.phase.load()).to_string(),
            plugins,
        }
    }
}
