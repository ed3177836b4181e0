//! Configuration management for ChatBranch
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatBranchError, Result};
use crate::tokens::{TierThresholds, DEFAULT_MAX_TOKENS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for ChatBranch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Message store settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Token accounting settings
    #[serde(default)]
    pub tokens: TokenConfig,
}

/// Message store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; the platform data directory is used when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Token accounting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Context window of the model the thread talks to
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// Usage percentage above which the display turns to warning
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    /// Usage percentage above which the display turns critical
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
}

fn default_max_tokens() -> u64 {
    DEFAULT_MAX_TOKENS
}

fn default_warning_threshold() -> f64 {
    TierThresholds::default().warning
}

fn default_critical_threshold() -> f64 {
    TierThresholds::default().critical
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
        }
    }
}

impl TokenConfig {
    pub fn thresholds(&self) -> TierThresholds {
        TierThresholds {
            warning: self.warning_threshold,
            critical: self.critical_threshold,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatBranchError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatBranchError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(db_path) = std::env::var("CHATBRANCH_DB_PATH") {
            tracing::debug!(db_path = %db_path, "Env override: CHATBRANCH_DB_PATH");
            self.storage.db_path = Some(PathBuf::from(db_path));
        }

        if let Ok(max_tokens) = std::env::var("CHATBRANCH_MAX_TOKENS") {
            match max_tokens.parse() {
                Ok(v) => self.tokens.max_tokens = v,
                Err(_) => tracing::warn!("Invalid CHATBRANCH_MAX_TOKENS: {}", max_tokens),
            }
        }

        if let Ok(warning) = std::env::var("CHATBRANCH_WARNING_THRESHOLD") {
            match warning.parse() {
                Ok(v) => self.tokens.warning_threshold = v,
                Err(_) => tracing::warn!("Invalid CHATBRANCH_WARNING_THRESHOLD: {}", warning),
            }
        }

        if let Ok(critical) = std::env::var("CHATBRANCH_CRITICAL_THRESHOLD") {
            match critical.parse() {
                Ok(v) => self.tokens.critical_threshold = v,
                Err(_) => tracing::warn!("Invalid CHATBRANCH_CRITICAL_THRESHOLD: {}", critical),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db_path) = &cli.db {
            tracing::debug!("Using storage DB override from CLI: {}", db_path.display());
            self.storage.db_path = Some(db_path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.tokens.max_tokens == 0 {
            return Err(
                ChatBranchError::Config("tokens.max_tokens must be greater than 0".to_string())
                    .into(),
            );
        }

        for (name, value) in [
            ("warning_threshold", self.tokens.warning_threshold),
            ("critical_threshold", self.tokens.critical_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ChatBranchError::Config(format!(
                    "tokens.{} must be between 0 and 100",
                    name
                ))
                .into());
            }
        }

        if self.tokens.warning_threshold >= self.tokens.critical_threshold {
            return Err(ChatBranchError::Config(
                "tokens.warning_threshold must be below tokens.critical_threshold".to_string(),
            )
            .into());
        }

        if let Some(path) = &self.storage.db_path {
            if path.as_os_str().is_empty() {
                return Err(
                    ChatBranchError::Config("storage.db_path cannot be empty".to_string()).into(),
                );
            }
        }

        Ok(())
    }
}
