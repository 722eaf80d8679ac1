//! Configuration management for taskwire
//!
//! Loads and saves dispatcher settings from `~/.taskwire/config.json` and
//! snapshots provider credentials from the process environment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod credentials;
pub mod paths;

pub use credentials::{Credentials, GEMINI_API_KEY};
pub use paths::{config_path, data_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG I/O ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("CONFIG PARSE ERROR: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Completion backend used for the optional synthesis pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Dispatcher limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
    #[serde(default = "default_max_payload_chars")]
    pub max_payload_chars: usize,
    /// Per-provider timeout overrides, in seconds
    #[serde(default)]
    pub provider_timeouts: HashMap<String, u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            max_parallelism: default_max_parallelism(),
            max_payload_chars: default_max_payload_chars(),
            provider_timeouts: HashMap::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_parallelism() -> usize {
    4
}

fn default_max_payload_chars() -> usize {
    8000
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Credentials stored in the file; the environment takes precedence
    #[serde(default)]
    pub credentials: HashMap<String, String>,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ READING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// System-wide provider timeout
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.default_timeout_secs.max(1))
    }

    /// Explicit per-provider overrides only
    pub fn provider_timeout_overrides(&self) -> HashMap<String, Duration> {
        self.dispatch
            .provider_timeouts
            .iter()
            .map(|(id, secs)| (id.clone(), Duration::from_secs((*secs).max(1))))
            .collect()
    }

    /// Fan-out concurrency bound, never zero
    pub fn max_parallelism(&self) -> usize {
        self.dispatch.max_parallelism.max(1)
    }

    pub fn max_payload_chars(&self) -> usize {
        self.dispatch.max_payload_chars
    }

    /// Completion backend key: config first, then `GEMINI_API_KEY`
    pub fn llm_api_key(&self, credentials: &Credentials) -> Option<String> {
        if !self.llm.api_key.is_empty() {
            return Some(self.llm.api_key.clone());
        }
        credentials.get(GEMINI_API_KEY).map(str::to_string)
    }

    pub fn has_llm_api_key(&self, credentials: &Credentials) -> bool {
        self.llm_api_key(credentials).is_some()
    }
}

/// Write a default config unless one already exists
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ CONFIG ALREADY PRESENT AT {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ CONFIG CREATED AT {:?}", config_path);
    }

    Config::load().await
}
