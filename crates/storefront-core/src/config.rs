//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the remote endpoints, the session lifetime requested at
//! login, the credential backend and the last used username.
//!
//! Configuration is stored at `~/.config/storefront/config.json`. Environment
//! variables override the file so tests and scripted runs can point the
//! client at a mock server.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "storefront";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Public auth API serving `/auth/login`
pub const DEFAULT_AUTH_BASE_URL: &str = "https://dummyjson.com";

/// Public API serving `/posts`
pub const DEFAULT_POSTS_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Session lifetime requested from the auth API, in minutes.
pub const DEFAULT_SESSION_LIFETIME_MINUTES: u32 = 30;

pub const ENV_AUTH_URL: &str = "STOREFRONT_AUTH_URL";
pub const ENV_POSTS_URL: &str = "STOREFRONT_POSTS_URL";
pub const ENV_CREDENTIALS: &str = "STOREFRONT_CREDENTIALS";

/// Where the persisted credential lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keychain via the `keyring` crate
    #[default]
    Keyring,
    /// Plain file in the cache directory, for headless machines without a keychain
    File,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("Unknown credential backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth_base_url: String,
    pub posts_base_url: String,
    pub session_lifetime_minutes: u32,
    pub credential_backend: CredentialBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            posts_base_url: DEFAULT_POSTS_BASE_URL.to_string(),
            session_lifetime_minutes: DEFAULT_SESSION_LIFETIME_MINUTES,
            credential_backend: CredentialBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load config from disk (defaults when missing) and apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `STOREFRONT_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_AUTH_URL).filter(|v| !v.is_empty()) {
            self.auth_base_url = url;
        }
        if let Some(url) = lookup(ENV_POSTS_URL).filter(|v| !v.is_empty()) {
            self.posts_base_url = url;
        }
        if let Some(raw) = lookup(ENV_CREDENTIALS) {
            match raw.parse() {
                Ok(backend) => self.credential_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_CREDENTIALS),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
