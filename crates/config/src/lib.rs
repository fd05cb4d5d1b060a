//! Configuration loading, validation, and management for copperclaw.
//!
//! Loads configuration from `~/.copperclaw/config.toml` with environment
//! variable overrides. Validates all settings at load time so bad budgets
//! or duplicate provider ids fail fast instead of corrupting turns later.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.copperclaw/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Prompt assembly and compression budgets
    #[serde(default)]
    pub context: ContextSettings,

    /// Fallback routing behavior and the provider registry
    #[serde(default)]
    pub fallback: FallbackSettings,
}

/// Budgets for prompt assembly and history compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    /// How many recent messages to send per turn (K)
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Token cap for the rolling-summary section
    #[serde(default = "default_summary_token_budget")]
    pub summary_token_budget: usize,

    /// Token cap applied to each tool result independently
    #[serde(default = "default_tool_output_token_budget")]
    pub tool_output_token_budget: usize,
}

fn default_history_window() -> usize {
    10
}
fn default_summary_token_budget() -> usize {
    800
}
fn default_tool_output_token_budget() -> usize {
    500
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            summary_token_budget: default_summary_token_budget(),
            tool_output_token_budget: default_tool_output_token_budget(),
        }
    }
}

/// Fallback routing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackSettings {
    /// Delay between a retryable failure and the next candidate
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Optional wall-clock cap per attempt; unset means the backend call
    /// runs until it resolves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_secs: Option<u64>,

    /// Provider to try first, ahead of priority order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,

    /// Registry entries, one per (backend, model) candidate
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            attempt_timeout_secs: None,
            preferred_provider: None,
            providers: Vec::new(),
        }
    }
}

impl FallbackSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs.map(Duration::from_secs)
    }
}

/// One provider registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Unique provider ID
    pub id: String,

    /// Model requested from this backend
    pub model: String,

    /// Lower priority is tried earlier
    #[serde(default)]
    pub priority: i32,
}

impl CoreConfig {
    /// Load configuration from the default path (~/.copperclaw/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `COPPERCLAW_PREFERRED_PROVIDER`
    /// - `COPPERCLAW_RETRY_DELAY_MS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(provider) = std::env::var("COPPERCLAW_PREFERRED_PROVIDER") {
            config.fallback.preferred_provider = Some(provider);
        }
        if let Ok(delay) = std::env::var("COPPERCLAW_RETRY_DELAY_MS") {
            config.fallback.retry_delay_ms =
                delay.parse().map_err(|_| ConfigError::ValidationError(
                    format!("COPPERCLAW_RETRY_DELAY_MS is not a number: {delay}"),
                ))?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".copperclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "context.history_window must be at least 1".into(),
            ));
        }
        if self.context.summary_token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "context.summary_token_budget must be at least 1".into(),
            ));
        }
        if self.context.tool_output_token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "context.tool_output_token_budget must be at least 1".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.fallback.providers {
            if provider.id.is_empty() {
                return Err(ConfigError::ValidationError(
                    "fallback provider id must not be empty".into(),
                ));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate fallback provider id: {}",
                    provider.id
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for onboarding).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
