//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the display currency, the price feed API key, the storage
//! backend for account data, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/cryptotracker/config.json`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::DEFAULT_CURRENCY;
use crate::storage::{FileStore, KeyringStore, SharedStore};

/// Application name used for config/data/cache directory paths
pub const APP_NAME: &str = "cryptotracker";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured API key
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Where account, session and preference data live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default)]
    pub last_email: Option<String>,
    /// Overrides the platform data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            api_key: None,
            storage: StorageBackend::default(),
            last_email: None,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config")
        } else {
            Ok(Self::default())
        }
    }

    /// API key for the price feed. `COINGECKO_API_KEY` wins over the stored
    /// key; the environment value is never written back to the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_env(&self, env_key: Option<String>) -> Option<String> {
        match env_key.filter(|k| !k.is_empty()) {
            Some(key) => {
                debug!("Using API key from environment");
                Some(key)
            }
            None => self.api_key.clone(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Open the configured storage backend.
    pub fn open_store(&self) -> Result<SharedStore> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStore::new(self.data_dir()?)?),
            StorageBackend::Keyring => Arc::new(KeyringStore::default()),
        })
    }
}
