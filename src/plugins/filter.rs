//! Plugin filtering stages.
//!
//! Two passes narrow the registry between discovery and initialization:
//! the enable filter applies the configured disable map and checks hard
//! dependencies, and the version filter excludes plugins whose version
//! does not satisfy the configured compatibility policy.

use std::collections::BTreeMap;
use std::collections::HashMap;

use semver::Version;

use crate::config::CompatibilityPolicy;
use crate::plugins::{PluginError, PluginRegistry};

/// Apply the configured enable map, then verify hard dependencies.
///
/// Disabling a plugin that a still-enabled plugin hard-requires is a
/// configuration error. Soft dependencies on disabled or missing plugins
/// are skipped silently.
pub fn check_enabled(
    registry: &mut PluginRegistry,
    enabled_map: &BTreeMap<String, bool>,
) -> Result<(), PluginError> {
    for plugin in registry.iter_mut() {
        if enabled_map.get(&plugin.id) == Some(&false) {
            plugin.enabled = false;
            tracing::info!(plugin = %plugin.id, "plugin disabled via configuration");
        }
    }

    let present: HashMap<&str, bool> = registry
        .iter()
        .map(|p| (p.id.as_str(), p.enabled))
        .collect();

    for plugin in registry.iter().filter(|p| p.enabled) {
        for required in &plugin.requires {
            match present.get(required.as_str()) {
                Some(true) => {}
                Some(false) => {
                    return Err(PluginError::Dependency {
                        dependent: plugin.id.clone(),
                        required: required.clone(),
                        reason: "is disabled via configuration".to_string(),
                    })
                }
                None => {
                    return Err(PluginError::Dependency {
                        dependent: plugin.id.clone(),
                        required: required.clone(),
                        reason: "is not installed".to_string(),
                    })
                }
            }
        }

        for optional in &plugin.optional {
            if present.get(optional.as_str()) != Some(&true) {
                tracing::debug!(
                    plugin = %plugin.id,
                    optional = %optional,
                    "optional dependency unavailable, skipping"
                );
            }
        }
    }

    Ok(())
}

/// Mark still-enabled plugins incompatible with the host version.
///
/// Exclusion is a diagnostic, never a pipeline failure: the descriptor is
/// kept for reporting but its init is not run.
pub fn check_version(
    registry: &mut PluginRegistry,
    host_version: &Version,
    policy: CompatibilityPolicy,
) {
    for plugin in registry.iter_mut().filter(|p| p.enabled) {
        let compatible = match policy {
            CompatibilityPolicy::Manifest => plugin
                .host_req
                .as_ref()
                .map_or(true, |req| req.matches(host_version)),
            CompatibilityPolicy::Exact => {
                plugin.version.major == host_version.major
                    && plugin.version.minor == host_version.minor
            }
        };

        if !compatible {
            let reason = match policy {
                CompatibilityPolicy::Manifest => format!(
                    "requires host {}, host is {}",
                    plugin
                        .host_req
                        .as_ref()
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                    host_version
                ),
                CompatibilityPolicy::Exact => format!(
                    "version {} does not match host {}.{}",
                    plugin.version, host_version.major, host_version.minor
                ),
            };
            tracing::warn!(
                plugin = %plugin.id,
                version = %plugin.version,
                reason = %reason,
                "plugin excluded as incompatible"
            );
            plugin.compatible = false;
            plugin.incompatibility = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{noop_init, PluginDescriptor, PluginManifest};
    use std::path::PathBuf;

    fn descriptor(manifest: &str) -> PluginDescriptor {
        let manifest: PluginManifest = toml::from_str(manifest).unwrap();
        PluginDescriptor::from_manifest(manifest, PathBuf::from("/plugins/test"), noop_init())
    }

    fn registry(manifests: &[&str]) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for m in manifests {
            registry.insert(descriptor(m)).unwrap();
        }
        registry
    }

    #[test]
    fn disable_map_flips_enabled() {
        let mut reg = registry(&["id = \"a\"\nversion = \"1.0.0\""]);
        let map = BTreeMap::from([("a".to_string(), false)]);
        check_enabled(&mut reg, &map).unwrap();
        assert!(!reg.get("a").unwrap().enabled);
    }

    #[test]
    fn hard_dependency_on_disabled_plugin_fails() {
        let mut reg = registry(&[
            "id = \"base\"\nversion = \"1.0.0\"",
            "id = \"ext\"\nversion = \"1.0.0\"\nrequires = [\"base\"]",
        ]);
        let map = BTreeMap::from([("base".to_string(), false)]);
        let err = check_enabled(&mut reg, &map).unwrap_err();
        match err {
            PluginError::Dependency { dependent, required, .. } => {
                assert_eq!(dependent, "ext");
                assert_eq!(required, "base");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn soft_dependency_on_disabled_plugin_is_skipped() {
        let mut reg = registry(&[
            "id = \"base\"\nversion = \"1.0.0\"",
            "id = \"ext\"\nversion = \"1.0.0\"\noptional = [\"base\", \"absent\"]",
        ]);
        let map = BTreeMap::from([("base".to_string(), false)]);
        check_enabled(&mut reg, &map).unwrap();
        assert!(reg.get("ext").unwrap().enabled);
    }

    #[test]
    fn disabling_the_dependent_clears_the_requirement() {
        let mut reg = registry(&[
            "id = \"base\"\nversion = \"1.0.0\"",
            "id = \"ext\"\nversion = \"1.0.0\"\nrequires = [\"base\"]",
        ]);
        let map = BTreeMap::from([
            ("base".to_string(), false),
            ("ext".to_string(), false),
        ]);
        check_enabled(&mut reg, &map).unwrap();
    }

    #[test]
    fn manifest_policy_uses_host_range() {
        let mut reg = registry(&[
            "id = \"old\"\nversion = \"0.9.0\"\nhost = \">=2.0\"",
            "id = \"open\"\nversion = \"0.1.0\"",
        ]);
        let host = Version::new(1, 0, 0);
        check_version(&mut reg, &host, CompatibilityPolicy::Manifest);

        let old = reg.get("old").unwrap();
        assert!(!old.compatible);
        assert!(old.incompatibility.is_some());
        assert!(reg.get("open").unwrap().compatible);
    }

    #[test]
    fn exact_policy_compares_major_minor() {
        let mut reg = registry(&[
            "id = \"match\"\nversion = \"1.0.7\"",
            "id = \"drift\"\nversion = \"1.1.0\"",
        ]);
        let host = Version::new(1, 0, 0);
        check_version(&mut reg, &host, CompatibilityPolicy::Exact);

        assert!(reg.get("match").unwrap().compatible);
        assert!(!reg.get("drift").unwrap().compatible);
    }

    #[test]
    fn disabled_plugins_are_not_version_checked() {
        let mut reg = registry(&["id = \"off\"\nversion = \"0.1.0\"\nhost = \">=9.0\""]);
        let map = BTreeMap::from([("off".to_string(), false)]);
        check_enabled(&mut reg, &map).unwrap();
        check_version(&mut reg, &Version::new(1, 0, 0), CompatibilityPolicy::Manifest);

        // Excluded by the enable filter already; no diagnostic is recorded.
        assert!(reg.get("off").unwrap().incompatibility.is_none());
    }
}
