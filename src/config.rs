//! Configuration for connector-relations

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RelationError;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("connector-relations")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and the config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Address the HTTP API binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Path prefix for every relation route and every external identifier
    #[serde(default = "default_api_base_path")]
    pub api_base_path: String,

    /// Reject removal of children that no longer exist in their own store.
    /// Off by default so links to children deleted out-of-band can be cleaned up.
    #[serde(default)]
    pub require_existing_child_on_remove: bool,

    /// JSON file with resources to create on startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

fn default_http_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_base_path() -> String {
    "/api/v2".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            api_base_path: default_api_base_path(),
            require_existing_child_on_remove: false,
            seed_file: None,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RelationError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| RelationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RelationError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RelationError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), RelationError> {
        if !self.api_base_path.starts_with('/') {
            return Err(RelationError::Config(format!(
                "api_base_path must start with '/', got '{}'",
                self.api_base_path
            )));
        }
        if self.api_base_path.len() > 1 && self.api_base_path.ends_with('/') {
            return Err(RelationError::Config(format!(
                "api_base_path must not end with '/', got '{}'",
                self.api_base_path
            )));
        }
        Ok(())
    }

    /// Get SQLite database path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("relations.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.api_base_path, "/api/v2");
        assert!(!config.require_existing_child_on_remove);
        assert!(config.seed_file.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            http_port: 9191,
            require_existing_child_on_remove: true,
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.http_port, 9191);
        assert!(loaded.require_existing_child_on_remove);
    }

    #[test]
    fn test_rejects_relative_base_path() {
        let config = Config {
            api_base_path: "api".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(RelationError::Config(_))));
    }
}
