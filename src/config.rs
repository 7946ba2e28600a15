//! Configuration loading.
//!
//! Reads the pushcount configuration file and applies environment variable
//! overrides on load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::constants::{DEFAULT_API_URL, DEFAULT_NOTIFICATION_TARGET_URL, DEFAULT_VAPID_PUBLIC_KEY};

/// Configuration for the pushcount binary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the remote subscription collaborator.
    pub api_url: String,
    /// Application server public key (URL-safe base64).
    pub vapid_public_key: String,
    /// Page opened when a notification is clicked.
    pub notification_target_url: String,
    /// Directory holding the worker's local database.
    ///
    /// Defaults to `data/` inside [`Config::config_dir`] when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            vapid_public_key: DEFAULT_VAPID_PUBLIC_KEY.to_string(),
            notification_target_url: DEFAULT_NOTIFICATION_TARGET_URL.to_string(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `PUSHCOUNT_CONFIG_DIR` env var: explicit override
    /// 2. `PUSHCOUNT_ENV=test`: `tmp/pushcount-test` in the repo
    /// 3. Default: platform config dir (e.g. `~/.config/pushcount`)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(custom_dir) = std::env::var("PUSHCOUNT_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else if crate::env::is_test_mode() {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/pushcount-test")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("pushcount")
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing or unreadable file falls back to defaults.
    pub fn load() -> Result<Self> {
        let mut config = match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("[Config] Using defaults: {e:#}");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))
        } else {
            anyhow::bail!("Config file not found")
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_url) = std::env::var("PUSHCOUNT_API_URL") {
            self.api_url = api_url;
        }

        if let Ok(key) = std::env::var("PUSHCOUNT_VAPID_PUBLIC_KEY") {
            self.vapid_public_key = key;
        }

        if let Ok(target) = std::env::var("PUSHCOUNT_TARGET_URL") {
            self.notification_target_url = target;
        }

        if let Ok(data_dir) = std::env::var("PUSHCOUNT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(data_dir));
        }
    }

    /// Directory for the worker's local database.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("data")),
        }
    }
}
