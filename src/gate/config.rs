//! Gateway configuration
//!
//! Sources in priority order:
//! 1. Command-line arguments (highest)
//! 2. Environment variables (`EMX_FANOUT_*`)
//! 3. Config file (`--config`, `./config.toml` or `~/.emx/fanout.toml`)
//! 4. Default values (lowest)

use crate::ProviderEndpoints;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host address to listen on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-provider call timeout in seconds (default: 120)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Profile store file
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Create profiles from provider keys in the environment when the store is empty
    #[serde(default)]
    pub seed_from_env: bool,

    /// Default provider base URLs
    #[serde(default)]
    pub endpoints: ProviderEndpoints,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
            store_path: default_store_path(),
            seed_from_env: false,
            endpoints: ProviderEndpoints::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8848
}

fn default_timeout() -> u64 {
    120
}

fn default_store_path() -> PathBuf {
    PathBuf::from("api_configs.json")
}

impl GatewayConfig {
    /// Load gateway configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: GatewayConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Find the config file: `./config.toml`, then `~/.emx/fanout.toml`
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from("./config.toml");
        if local.exists() {
            return Some(local);
        }
        let home = dirs::home_dir()?.join(".emx").join("fanout.toml");
        home.exists().then_some(home)
    }

    /// Override fields from `EMX_FANOUT_*` variables
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("EMX_FANOUT_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("EMX_FANOUT_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("EMX_FANOUT_PORT is not a port: {}", port))?;
        }
        if let Some(timeout) = lookup("EMX_FANOUT_TIMEOUT") {
            self.timeout_secs = timeout
                .parse()
                .with_context(|| format!("EMX_FANOUT_TIMEOUT is not a number: {}", timeout))?;
        }
        if let Some(store) = lookup("EMX_FANOUT_STORE") {
            self.store_path = PathBuf::from(store);
        }
        Ok(())
    }

    /// Check port and timeout ranges
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port < 1024 {
            anyhow::bail!("Invalid port: {} (must be between 1024 and 65535)", self.port);
        }
        if !(10..=600).contains(&self.timeout_secs) {
            anyhow::bail!(
                "Invalid timeout: {} (must be between 10 and 600 seconds)",
                self.timeout_secs
            );
        }
        Ok(())
    }

    /// Per-provider call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
