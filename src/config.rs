//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Provider keys are referenced by env-var name in the config and
//! resolved at runtime into `SecretString`s.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::llm::ProviderKind;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Which provider answers chat requests.
    #[serde(default)]
    pub provider: ProviderKind,
    /// Model override; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_gemini_key_env")]
    pub gemini_api_key_env: String,
    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,
    /// Transport timeout for the provider call. Unset means none.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            gemini_api_key_env: default_gemini_key_env(),
            openai_api_key_env: default_openai_key_env(),
            timeout_secs: None,
        }
    }
}

impl ChatConfig {
    /// Env-var name holding the key for the selected provider.
    pub fn api_key_env(&self) -> &str {
        match self.provider {
            ProviderKind::Gemini => &self.gemini_api_key_env,
            ProviderKind::OpenAi => &self.openai_api_key_env,
        }
    }

    /// Resolve the selected provider's key. `None` if unset or blank.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        AppConfig::resolve_env(self.api_key_env())
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Local snapshot file, also served at `/ai_predictions.json`.
    #[serde(default = "default_feed_path")]
    pub path: String,
    /// Fetch the snapshot over HTTP instead of reading `path`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: default_feed_path(),
            url: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_feed_path() -> String {
    "ai_predictions.json".to_string()
}

fn default_history_path() -> String {
    "ai_history.json".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
