//! Configuration for kipit

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::DEFAULT_LIST;

/// Tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub lists: ListsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// How long to wait for a page before falling back to its address
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User agent sent when fetching judge pages
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory export files are written to
    #[serde(default = "default_export_dir")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListsConfig {
    /// List new problems go to and `show` displays
    #[serde(default = "default_active_list")]
    pub active: String,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("kipit").join("kipit.sqlite"))
        .unwrap_or_else(|| PathBuf::from("kipit.sqlite"))
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    format!("kipit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_active_list() -> String {
    DEFAULT_LIST.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_dir(),
        }
    }
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            active: default_active_list(),
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Default config path
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("KIPIT_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Ok(local);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("kipit");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let with_comments = format!(
            "# kipit configuration\n\
             # Override the location with KIPIT_CONFIG=/path/to/config.toml\n\n\
             {}",
            content
        );

        std::fs::write(path, with_comments).context("Failed to write config file")?;

        Ok(())
    }
}
