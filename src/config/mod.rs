//! Configuration management for tablesnap
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Prefix of environment variables read by [`Config::apply_env`].
pub const ENV_PREFIX: &str = "TABLESNAP_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Export run configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Export run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Table to export
    #[serde(default)]
    pub table: String,

    /// Region hosting the table
    #[serde(default = "default_region")]
    pub region: String,

    /// Fixed page limit (defaults to 100 when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_limit: Option<u32>,

    /// Fraction of provisioned read capacity to use per page, in (0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_percent: Option<f64>,

    /// Number of segments scanned in parallel
    #[serde(default = "default_total_segments")]
    pub total_segments: u32,

    /// Stop sibling segments once one segment fails
    #[serde(default)]
    pub cancel_on_failure: bool,

    /// Show a progress spinner
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,

    /// Table dump served by the in-memory backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    /// Output file (a timestamped name is generated when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_total_segments() -> u32 {
    1
}

fn default_show_progress() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            region: default_region(),
            page_limit: None,
            throughput_percent: None,
            total_segments: default_total_segments(),
            cancel_on_failure: false,
            show_progress: default_show_progress(),
            source: None,
            output: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `~/.tablesnap/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tablesnap")
            .join("config.toml")
    }

    /// Load configuration from a file
    ///
    /// Falls back to defaults when no path is given and the default file
    /// does not exist. An explicitly given path must exist.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::FileNotFound(p.display().to_string()).into());
                }
                p.to_path_buf()
            }
            None => {
                let p = Self::default_config_path();
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Serialize the configuration to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Apply `TABLESNAP_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment-like lookup
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(table) = var("TABLE") {
            self.export.table = table;
        }
        if let Some(region) = var("REGION") {
            self.export.region = region;
        }
        if let Some(limit) = var("LIMIT") {
            self.export.page_limit = Some(parse_env("LIMIT", &limit)?);
        }
        if let Some(percent) = var("THROUGHPUT_PERCENT") {
            self.export.throughput_percent = Some(parse_env("THROUGHPUT_PERCENT", &percent)?);
        }
        if let Some(segments) = var("SEGMENTS") {
            self.export.total_segments = parse_env("SEGMENTS", &segments)?;
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let export = &self.export;

        if export.table.trim().is_empty() {
            return Err(ConfigError::MissingField("export.table".to_string()).into());
        }
        if export.region.trim().is_empty() {
            return Err(ConfigError::MissingField("export.region".to_string()).into());
        }
        if export.total_segments == 0 {
            return Err(invalid("export.total_segments", export.total_segments));
        }
        if export.page_limit == Some(0) {
            return Err(invalid("export.page_limit", 0));
        }
        if let Some(percent) = export.throughput_percent {
            if !(percent > 0.0 && percent <= 1.0) {
                return Err(invalid("export.throughput_percent", percent));
            }
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: format!("{ENV_PREFIX}{name}"),
            value: value.to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, value: impl std::fmt::Display) -> crate::error::TableSnapError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
