//! Application configuration
//!
//! Stored in ~/.config/justvibe/config.json. Every field has a default so a
//! missing file (or a file that only sets a few keys) is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CATALOG_URL: &str = "http://localhost:9090/justvibe-backend/albums";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint returning the album list
    pub catalog_url: String,
    /// Where downloaded tracks and album archives are saved
    pub download_dir: PathBuf,
    /// Where favorites, library, history and the session live
    pub data_dir: PathBuf,
    /// Maximum number of concurrent HEAD probes when sizing an album
    pub probe_parallelism: usize,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Pause after a finished album download before the dialog closes
    pub completion_pause_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            data_dir: dirs::data_dir()
                .map(|d| d.join("justvibe"))
                .unwrap_or_else(|| PathBuf::from(".justvibe")),
            probe_parallelism: 8,
            request_timeout_secs: 30,
            completion_pause_ms: 1000,
        }
    }
}

impl Config {
    /// Load the config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the config from an explicit path, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Self =
            serde_json::from_str(&contents).with_context(|| "Failed to parse config")?;

        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save the config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Apply command line / environment overrides on top of the file values
    pub fn with_overrides(mut self, catalog_url: Option<String>, download_dir: Option<PathBuf>) -> Self {
        if let Some(url) = catalog_url {
            self.catalog_url = url;
        }
        if let Some(dir) = download_dir {
            self.download_dir = dir;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn completion_pause(&self) -> Duration {
        Duration::from_millis(self.completion_pause_ms)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("justvibe").join("config.json"))
    }
}
