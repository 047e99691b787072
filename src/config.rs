//! Configuration management for AuthTabs
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from YAML files and environment variables.
//!
//! Every timing constant the lifecycle controller uses lives here so that
//! tests can run with millisecond timeouts instead of the ten second
//! production fallback.

use crate::error::{AuthTabsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound accepted for `tabs.max_concurrent_tabs`
const MAX_CONCURRENT_TABS_CEILING: usize = 100;

/// Main configuration structure for AuthTabs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ephemeral tab lifecycle configuration
    #[serde(default)]
    pub tabs: TabLifecycleConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timing and capacity settings for the tab lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabLifecycleConfig {
    /// Fallback timeout after which a tracked tab is closed regardless of signals
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,

    /// Delay applied to content-load signals before acting on them
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of tabs accepted in a single batch tracking request
    #[serde(default = "default_max_concurrent_tabs")]
    pub max_concurrent_tabs: usize,
}

fn default_fallback_timeout_ms() -> u64 {
    10_000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_max_concurrent_tabs() -> usize {
    5
}

impl Default for TabLifecycleConfig {
    fn default() -> Self {
        Self {
            fallback_timeout_ms: default_fallback_timeout_ms(),
            debounce_ms: default_debounce_ms(),
            max_concurrent_tabs: default_max_concurrent_tabs(),
        }
    }
}

impl TabLifecycleConfig {
    /// Fallback timeout as a `Duration`
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    /// Content-load debounce interval as a `Duration`
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Builds a config with custom timings, keeping the default capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use authtabs::config::TabLifecycleConfig;
    ///
    /// let config = TabLifecycleConfig::with_timings(
    ///     Duration::from_millis(50),
    ///     Duration::from_millis(5),
    /// );
    /// assert_eq!(config.fallback_timeout(), Duration::from_millis(50));
    /// assert_eq!(config.max_concurrent_tabs, 5);
    /// ```
    pub fn with_timings(fallback_timeout: Duration, debounce: Duration) -> Self {
        Self {
            fallback_timeout_ms: fallback_timeout.as_millis() as u64,
            debounce_ms: debounce.as_millis() as u64,
            ..Self::default()
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDOUT only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. Environment variables are applied on top in both cases.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthTabsError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AuthTabsError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(timeout) = std::env::var("AUTHTABS_FALLBACK_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse() {
                self.tabs.fallback_timeout_ms = value;
            } else {
                tracing::warn!("Invalid AUTHTABS_FALLBACK_TIMEOUT_MS: {}", timeout);
            }
        }

        if let Ok(debounce) = std::env::var("AUTHTABS_DEBOUNCE_MS") {
            if let Ok(value) = debounce.parse() {
                self.tabs.debounce_ms = value;
            } else {
                tracing::warn!("Invalid AUTHTABS_DEBOUNCE_MS: {}", debounce);
            }
        }

        if let Ok(max_tabs) = std::env::var("AUTHTABS_MAX_CONCURRENT_TABS") {
            if let Ok(value) = max_tabs.parse() {
                self.tabs.max_concurrent_tabs = value;
            } else {
                tracing::warn!("Invalid AUTHTABS_MAX_CONCURRENT_TABS: {}", max_tabs);
            }
        }

        if let Ok(level) = std::env::var("AUTHTABS_LOG_LEVEL") {
            tracing::debug!(level = %level, "Env override: AUTHTABS_LOG_LEVEL");
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("AUTHTABS_LOG_JSON") {
            match json.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid AUTHTABS_LOG_JSON: {}", json),
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `AuthTabsError::Config` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.tabs.fallback_timeout_ms == 0 {
            return Err(AuthTabsError::Config(
                "tabs.fallback_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tabs.debounce_ms == 0 {
            return Err(
                AuthTabsError::Config("tabs.debounce_ms must be greater than 0".to_string()).into(),
            );
        }

        if self.tabs.debounce_ms >= self.tabs.fallback_timeout_ms {
            return Err(AuthTabsError::Config(
                "tabs.debounce_ms must be less than tabs.fallback_timeout_ms".to_string(),
            )
            .into());
        }

        if self.tabs.max_concurrent_tabs == 0 {
            return Err(AuthTabsError::Config(
                "tabs.max_concurrent_tabs must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tabs.max_concurrent_tabs > MAX_CONCURRENT_TABS_CEILING {
            return Err(AuthTabsError::Config(format!(
                "tabs.max_concurrent_tabs must be less than or equal to {}",
                MAX_CONCURRENT_TABS_CEILING
            ))
            .into());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(AuthTabsError::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}
