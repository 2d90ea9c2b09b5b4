//! Configuration module for tagq
//!
//! Engine limits and the default database location. Configuration is stored
//! as TOML in the user's config directory; missing keys fall back to defaults.

use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of counted clauses in one query
    pub tag_query_limit: usize,

    /// Metatags that do not count towards `tag_query_limit`
    pub untallied_metatags: Vec<String>,

    /// Page size used when a query has no `limit:`
    pub default_limit: u32,

    /// Upper bound applied to `limit:`
    pub max_limit: u32,

    /// Database used when `--db` is not given
    pub database: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tag_query_limit: 6,
            untallied_metatags: vec!["rating".into(), "status".into(), "limit".into()],
            default_limit: 20,
            max_limit: 1000,
            database: None,
        }
    }
}

impl EngineConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::Message("Could not determine config directory".to_string())
        })?;

        Ok(config_dir.join("tagq").join("config.toml"))
    }

    /// Default database location under the user's data directory
    #[must_use]
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tagq")
            .join("db")
    }

    /// Load configuration from the default location, or defaults when it does not exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            log::debug!("no config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the parent directory cannot be created, the configuration
    /// cannot be serialized, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Render as TOML for display
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))
    }

    /// Page size for a query's `limit:` value, or `default_limit` without one,
    /// clamped to `max_limit`
    #[must_use]
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tag_query_limit, 6);
        assert_eq!(config.untallied_metatags, vec!["rating", "status", "limit"]);
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.max_limit, 1000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = EngineConfig {
            tag_query_limit: 10,
            ..EngineConfig::default()
        };

        config.save_to(&path).unwrap();
        let loaded = EngineConfig::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tag_query_limit = 2\n").unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();

        assert_eq!(loaded.tag_query_limit, 2);
        assert_eq!(loaded.max_limit, 1000);
        assert_eq!(loaded.untallied_metatags.len(), 3);
    }

    #[test]
    fn test_page_size() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size(None), 20);
        assert_eq!(config.page_size(Some(5)), 5);
        assert_eq!(config.page_size(Some(5000)), 1000);
    }
}
