//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;

use chassis::Settings;

/// Settings that never bind a real port and never auto-listen.
pub fn base_settings() -> Settings {
    Settings::new()
        .set("server.bind_address", "127.0.0.1:0")
        .set("server.auto_listen", false)
}

/// Point the plugin scanner at the given directories.
pub fn with_scan_dirs(settings: Settings, dirs: &[&Path]) -> Settings {
    let values = dirs
        .iter()
        .map(|d| toml::Value::String(d.display().to_string()))
        .collect();
    settings.set("plugins.scan_dirs", toml::Value::Array(values))
}

/// Write one plugin directory with its manifest under `root`.
#[allow(dead_code)]
pub fn write_plugin(root: &Path, dir: &str, manifest: &str) {
    let plugin_dir = root.join(dir);
    fs::create_dir_all(&plugin_dir).unwrap();
    fs::write(plugin_dir.join("plugin.toml"), manifest).unwrap();
}
