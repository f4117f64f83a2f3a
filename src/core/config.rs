use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

const DEFAULT_CACHE_TTL_SECS: u64 = 30;

static CONFIG_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs::config_dir().map(|dir| dir.join("procbridge").join("config.json")));

/// User-facing overrides for tool resolution and telemetry behavior.
///
/// Everything is optional; an absent file means defaults. The file is plain
/// JSON under the user config directory so it can be hand-edited.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Explicit path to the adb binary, tried before any discovery.
    #[serde(default)]
    pub adb_path: Option<String>,
    /// Preferred interactive shell for new PTY sessions.
    #[serde(default)]
    pub preferred_shell: Option<String>,
    /// Disable disk usage probing entirely (snapshot reports zeros).
    #[serde(default)]
    pub disk_probing: Option<bool>,
    /// TTL for the expensive disk/GPU telemetry caches, in seconds.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(&config_path)?;
        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        // A corrupted file falls back to defaults rather than blocking
        // startup; the next save rewrites it.
        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("config file {} unreadable: {e}", config_path.display());
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| BridgeError::config(format!("failed to serialize config: {e}")))?;
        fs::write(&config_path, data)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        CONFIG_PATH
            .clone()
            .ok_or_else(|| BridgeError::config("could not determine config directory"))
    }

    pub fn disk_probing(&self) -> bool {
        self.disk_probing.unwrap_or(true)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }
}
