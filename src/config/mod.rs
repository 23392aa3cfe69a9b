//! Local configuration for gator.
//!
//! The config lives at `~/.gatorconfig.toml` and records which user is
//! logged in plus where the database is. It is read once at startup and
//! rewritten whenever the current user changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".gatorconfig.toml";

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub db_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,

    #[serde(skip)]
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, a default one is written first.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_config_path()?)
    }

    /// Load configuration from `path`, creating it with defaults if missing.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        if !path.exists() {
            let config = Self {
                db_url: default_db_url(),
                current_user_name: None,
                path,
            };
            config.save()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        config.path = path;

        Ok(config)
    }

    /// Get the default config file path: `~/.gatorconfig.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the current user and persist the change.
    pub fn set_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&self.path, content).map_err(|e| ConfigError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

fn default_db_url() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gator")
        .join("gator.db")
        .to_string_lossy()
        .to_string()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert!(config.current_user_name.is_none());
        assert!(config.db_url.ends_with("gator.db"));
    }

    #[test]
    fn test_set_user_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "db_url = \"/tmp/gator-test.db\"\n").unwrap();

        let mut config = Config::load_from(&path).unwrap();
        config.set_user("alice").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.current_user_name.as_deref(), Some("alice"));
        assert_eq!(reloaded.db_url, "/tmp/gator-test.db");
    }

    #[test]
    fn test_set_user_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "db_url = \"gator.db\"\ncurrent_user_name = \"alice\"\n",
        )
        .unwrap();

        let mut config = Config::load_from(&path).unwrap();
        config.set_user("bob").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.current_user_name.as_deref(), Some("bob"));
    }

    #[test]
    fn test_invalid_config_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "db_url = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_db_url_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "current_user_name = \"alice\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
