//! Configuration module for netres
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/netres/netres.toml)
//! - User configuration (~/.netres.toml)
//! - Project configuration (./netres.toml)
//! - Environment variables
//!
//! Files may be TOML, YAML or JSON, chosen by extension.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::modules::State;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default settings
    pub defaults: Defaults,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,
}

/// Default configuration values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// State used when `run` is given none
    pub state: State,

    /// Output format: human, json or yaml
    pub output: String,

    /// Generate commands without applying them
    pub check_mode: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            state: State::Merged,
            output: "human".to_string(),
            check_mode: false,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `RUST_LOG` nor `-v` says otherwise
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Colors configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A config file as written, every setting optional so that layering
/// only overrides what a file actually sets
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    defaults: DefaultsFile,
    logging: LoggingFile,
    colors: ColorsFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DefaultsFile {
    state: Option<State>,
    output: Option<String>,
    check_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingFile {
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ColorsFile {
    enabled: Option<bool>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest priority first
    fn get_config_paths(explicit_path: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.to_path_buf()];
        }
        if let Ok(env_config) = std::env::var("NETRES_CONFIG") {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = vec![PathBuf::from("/etc/netres/netres.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".netres.toml"));
        }
        paths.push(PathBuf::from("netres.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file: ConfigFile = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        self.merge(file);
        Ok(())
    }

    fn merge(&mut self, other: ConfigFile) {
        if let Some(state) = other.defaults.state {
            self.defaults.state = state;
        }
        if let Some(output) = other.defaults.output {
            self.defaults.output = output;
        }
        if let Some(check_mode) = other.defaults.check_mode {
            self.defaults.check_mode = check_mode;
        }
        if let Some(level) = other.logging.log_level {
            self.logging.log_level = level;
        }
        if let Some(enabled) = other.colors.enabled {
            self.colors.enabled = enabled;
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // NETRES_STATE
        if let Ok(state) = std::env::var("NETRES_STATE") {
            match state.parse() {
                Ok(state) => self.defaults.state = state,
                Err(e) => tracing::warn!("ignoring NETRES_STATE: {}", e),
            }
        }

        // NETRES_OUTPUT
        if let Ok(output) = std::env::var("NETRES_OUTPUT") {
            self.defaults.output = output;
        }

        // NETRES_LOG_LEVEL
        if let Ok(level) = std::env::var("NETRES_LOG_LEVEL") {
            self.logging.log_level = level;
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("NETRES_NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }
    }

    /// Load from a specific file on top of the defaults, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Config::default();
        config.merge_from_file(path.as_ref())?;
        Ok(config)
    }
}
