//! Application configuration management.
//!
//! This module handles loading and saving the configuration: the endpoint
//! map, the fallback base URL, the catalog TTL and the request timeout.
//!
//! Configuration is stored at `~/.config/catalogsync/config.json`. A missing
//! file yields the defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{Endpoint, EndpointResolver};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "catalogsync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL used for endpoints missing from the configuration.
pub const DEFAULT_FALLBACK_BASE_URL: &str = "http://localhost:8080/api";

/// Catalog data is trusted for a week.
pub const DEFAULT_TTL_DAYS: u32 = 7;

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fallback_base_url: String,
    /// Endpoint id (e.g. `"brands"`) to URL.
    pub endpoints: BTreeMap<String, String>,
    pub ttl_days: u32,
    pub request_timeout_secs: u64,
    /// Overrides the platform cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_base_url: DEFAULT_FALLBACK_BASE_URL.to_string(),
            endpoints: BTreeMap::new(),
            ttl_days: DEFAULT_TTL_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

impl EndpointResolver for Config {
    fn endpoint_by_id(&self, id: &str) -> Option<Endpoint> {
        self.endpoints
            .get(id)
            .filter(|url| !url.trim().is_empty())
            .map(|url| Endpoint { url: url.clone() })
    }

    fn fallback_url(&self, id: &str) -> String {
        format!("{}/{}", self.fallback_base_url.trim_end_matches('/'), id)
    }
}
