//! Configuration resolution from settings.

use std::fs;

use crate::config::schema::ChassisConfig;
use crate::config::settings::Settings;
use crate::config::validation::validate_config;
use crate::config::ConfigError;

/// Resolve settings into a validated configuration.
///
/// The optional config file is parsed first, overrides are merged on top
/// by key path, then the merged tree is deserialized and validated.
pub fn resolve(settings: &Settings) -> Result<ChassisConfig, ConfigError> {
    let mut root = match settings.file() {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str::<toml::Table>(&content)?
        }
        None => toml::Table::new(),
    };

    for (path, value) in settings.overrides() {
        insert_path(&mut root, path, value.clone())?;
    }

    let config: ChassisConfig = toml::Value::Table(root).try_into()?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Insert a value at a dotted key path, creating intermediate tables.
fn insert_path(root: &mut toml::Table, path: &str, value: toml::Value) -> Result<(), ConfigError> {
    let mut segments = path.split('.').peekable();
    let mut table = root;

    loop {
        let segment = segments.next().ok_or_else(|| ConfigError::Override {
            path: path.to_string(),
            reason: "empty key path".to_string(),
        })?;
        if segment.is_empty() {
            return Err(ConfigError::Override {
                path: path.to_string(),
                reason: "empty key segment".to_string(),
            });
        }

        if segments.peek().is_none() {
            table.insert(segment.to_string(), value);
            return Ok(());
        }

        let entry = table
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        table = match entry.as_table_mut() {
            Some(t) => t,
            None => {
                return Err(ConfigError::Override {
                    path: path.to_string(),
                    reason: format!("`{segment}` is not a table"),
                })
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_file() {
        let config = resolve(&Settings::new()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8090");
        assert!(config.server.auto_listen);
    }

    #[test]
    fn overrides_merge_by_key_path() {
        let settings = Settings::new()
            .set("server.bind_address", "127.0.0.1:0")
            .set("server.auto_listen", false)
            .set("plugins.enabled.search", false);
        let config = resolve(&settings).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:0");
        assert!(!config.server.auto_listen);
        assert_eq!(config.plugins.enabled.get("search"), Some(&false));
    }

    #[test]
    fn later_override_wins() {
        let settings = Settings::new()
            .set("logging.filter", "debug")
            .set("logging.filter", "warn");
        let config = resolve(&settings).unwrap();
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn override_through_scalar_is_rejected() {
        let settings = Settings::new()
            .set("server.bind_address", "127.0.0.1:0")
            .set("server.bind_address.port", 80);
        let err = resolve(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::Override { .. }));
    }

    #[test]
    fn file_values_are_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chassis.toml");
        std::fs::write(&path, "[server]\nbind_address = \"0.0.0.0:80\"\n").unwrap();

        let settings = Settings::from_file(&path).set("server.bind_address", "127.0.0.1:0");
        let config = resolve(&settings).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:0");
    }
}
