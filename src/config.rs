//! Per-module configuration files
//!
//! Each module gets a data directory named after it under the host's
//! modules root, holding a `config.toml` the module (or an operator) edits.
//! The host never interprets the contents; it only loads, merges defaults,
//! and saves.

use crate::id::ModuleId;
use std::path::{Path, PathBuf};

/// Name of the per-module configuration file.
pub const CONFIG_FILE: &str = "config.toml";

/// The default modules root directory.
pub fn default_modules_dir() -> PathBuf {
    PathBuf::from("modules")
}

/// A module's data directory under the modules root.
pub fn data_dir_in(base: &Path, module: &ModuleId) -> PathBuf {
    base.join(module.as_str())
}

/// Path of a module's config file inside its data directory.
pub fn config_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Create a data directory if it does not exist yet.
pub fn ensure_data_dir(data_dir: &Path) -> anyhow::Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)?;
    }
    Ok(())
}

/// Opaque key/value settings for one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSettings {
    values: toml::Table,
}

impl ModuleSettings {
    /// Load settings from a file; `None` if the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let values: toml::Table = toml::from_str(&contents)?;
        Ok(Some(Self { values }))
    }

    /// Load settings, falling back to an empty table.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::load(path)?.unwrap_or_default())
    }

    /// Persist the settings, overwriting any previous file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(&self.values)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Write `defaults` to `path` only when no config exists yet.
    pub fn save_default(path: &Path, defaults: &toml::Table) -> anyhow::Result<()> {
        if path.exists() {
            return Ok(());
        }
        let contents = toml::to_string_pretty(defaults)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.values.get(key)
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: toml::Value) {
        self.values.insert(key.into(), value);
    }

    /// Fill in any keys missing from these settings with defaults.
    /// Existing keys always win.
    pub fn merge_defaults(&mut self, defaults: &toml::Table) {
        for (key, value) in defaults {
            if !self.values.contains_key(key) {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the settings are empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(ModuleSettings::load(&path).unwrap().is_none());
        assert!(ModuleSettings::load_or_default(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut settings = ModuleSettings::default();
        settings.set("greeting", toml::Value::String("hello".to_string()));
        settings.set("limit", toml::Value::Integer(4));
        settings.save(&path).unwrap();

        let loaded = ModuleSettings::load(&path).unwrap().unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.get("limit"), Some(&toml::Value::Integer(4)));
    }

    #[test]
    fn test_merge_defaults_keeps_existing() {
        let mut settings = ModuleSettings::default();
        settings.set("limit", toml::Value::Integer(4));

        let mut defaults = toml::Table::new();
        defaults.insert("limit".to_string(), toml::Value::Integer(10));
        defaults.insert("enabled".to_string(), toml::Value::Boolean(true));
        settings.merge_defaults(&defaults);

        assert_eq!(settings.get("limit"), Some(&toml::Value::Integer(4)));
        assert_eq!(settings.get("enabled"), Some(&toml::Value::Boolean(true)));
    }

    #[test]
    fn test_save_default_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut settings = ModuleSettings::default();
        settings.set("limit", toml::Value::Integer(4));
        settings.save(&path).unwrap();

        let mut defaults = toml::Table::new();
        defaults.insert("limit".to_string(), toml::Value::Integer(10));
        ModuleSettings::save_default(&path, &defaults).unwrap();

        let loaded = ModuleSettings::load(&path).unwrap().unwrap();
        assert_eq!(loaded.get("limit"), Some(&toml::Value::Integer(4)));
    }

    #[test]
    fn test_data_dir_layout() {
        let module = ModuleId::parse("shops").unwrap();
        let dir = data_dir_in(Path::new("modules"), &module);
        assert_eq!(dir, PathBuf::from("modules/shops"));
        assert_eq!(config_path_in(&dir), PathBuf::from("modules/shops/config.toml"));
    }
}
