//! User configuration, read from `<config_dir>/snix-compose/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::StorageKeys;

pub const DEFAULT_STORAGE_KEY: &str = "customJsSnippets";
pub const DEFAULT_ERROR_STORAGE_KEY: &str = "customJsSnippets_error";
pub const DEFAULT_REPO: &str = "./master.repo.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where snapshots are stored. Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
    pub storage_key: String,
    pub error_storage_key: String,
    /// Repo manifests offered by `repos`.
    pub repos: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub max_import_depth: usize,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            error_storage_key: DEFAULT_ERROR_STORAGE_KEY.to_string(),
            repos: vec![DEFAULT_REPO.to_string()],
            fetch_timeout_secs: 10,
            max_import_depth: 16,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("snix-compose").join("config.toml"))
    }

    /// Loads the default config file, or defaults when there is none.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys {
            primary: self.storage_key.clone(),
            quarantine: self.error_storage_key.clone(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
