//! Server configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use slashhook_core::{DEFAULT_API_BASE_URL, MAX_RESPONSE_TIME};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route the platform is configured to POST interactions to.
    #[serde(default = "default_interactions_path")]
    pub interactions_path: String,
    /// API root including the version segment.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Guilds the built-in commands are registered to (in addition to
    /// globally). Also swept for stale commands during sync.
    #[serde(default)]
    pub guild_ids: Vec<String>,
    #[serde(default = "default_max_response_time_ms")]
    pub max_response_time_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_interactions_path() -> String {
    "/interactions".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_max_response_time_ms() -> u64 {
    MAX_RESPONSE_TIME.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            interactions_path: default_interactions_path(),
            api_base_url: default_api_base_url(),
            guild_ids: Vec::new(),
            max_response_time_ms: default_max_response_time_ms(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load config from `config/default.toml`, then the user config dir,
    /// falling back to defaults.
    pub fn load() -> Result<Self> {
        for path in Self::candidate_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Config::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config/default.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("slashhook").join("config.toml"));
        }
        paths
    }

    pub fn max_response_time(&self) -> Duration {
        Duration::from_millis(self.max_response_time_ms)
    }
}
