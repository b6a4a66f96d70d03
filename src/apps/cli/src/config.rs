//! CLI configuration
//!
//! Read from `config.toml` in the platform config directory, then overridden by
//! `FINCHAT_BASE_URL` and command-line flags.

use anyhow::{Context, Result};
use finchat_core::infrastructure::config::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL};
use finchat_core::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BASE_URL_ENV: &str = "FINCHAT_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub base_url: String,
    pub chat_model: String,
    /// Stock selected when none is given on the command line.
    pub stock: Option<String>,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            stock: None,
            request_timeout_secs: client.request_timeout.as_secs(),
            stream_idle_timeout_secs: client.stream_idle_timeout.as_secs(),
        }
    }
}

impl CliConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("finchat").join("config.toml"))
    }

    /// Load from an explicit path (which must exist) or the default location
    /// (which may be absent).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url;
            }
        }
    }

    pub fn apply_overrides(&mut self, base_url: Option<String>, chat_model: Option<String>) {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(chat_model) = chat_model {
            self.chat_model = chat_model;
        }
    }

    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig {
            base_url: self.base_url.clone(),
            chat_model: self.chat_model.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stream_idle_timeout: Duration::from_secs(self.stream_idle_timeout_secs),
            ..ClientConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}
