//! Configuration loading and logging setup
//!
//! Config file resolution follows this priority order:
//! 1. Explicit path (command-line argument)
//! 2. `MASTERING_CONFIG` environment variable
//! 3. `<user config dir>/mastering/config.toml`
//! 4. Compiled defaults
//!
//! A missing file is not fatal: a warning is logged and defaults are used.
//! A file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MASTERING_CONFIG";
/// Environment override for the primary oracle API key
pub const PRIMARY_API_KEY_ENV_VAR: &str = "MASTERING_PRIMARY_API_KEY";
/// Environment override for the reviewer oracle API key
pub const REVIEWER_API_KEY_ENV_VAR: &str = "MASTERING_REVIEWER_API_KEY";

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Path was named but no file exists; defaults used
    Missing(PathBuf),
    /// No path named and no file in the config directory; defaults used
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded configuration"),
            ConfigSource::Missing(path) => warn!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            ),
            ConfigSource::Defaults => info!("No configuration file, using defaults"),
        }
    }
}

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub correction: CorrectionSettings,

    #[serde(default)]
    pub oracle: OracleSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// How per-window loudness readings collapse into one observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoudnessAggregate {
    /// Integrated loudness over the whole trial buffer
    Track,
    /// Loudest measured window
    Worst,
}

impl Default for LoudnessAggregate {
    fn default() -> Self {
        LoudnessAggregate::Track
    }
}

/// Self-correction loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSettings {
    /// Accepted distance from target loudness (dB, default: 0.5)
    #[serde(default = "default_loudness_tolerance_db")]
    pub loudness_tolerance_db: f64,

    /// Allowed excess over target peak (dB, default: 0.1)
    #[serde(default = "default_peak_margin_db")]
    pub peak_margin_db: f64,

    /// Render/measure iterations before giving up (default: 8)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Length of each measurement window (seconds, default: 10.0)
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    /// Evenly spaced windows across the back half of the track (default: 3)
    #[serde(default = "default_tail_windows")]
    pub tail_windows: usize,

    /// Largest gain cut one peak correction may apply (dB, default: 3.0)
    #[serde(default = "default_max_peak_cut_db")]
    pub max_peak_cut_db: Option<f64>,

    #[serde(default)]
    pub loudness_aggregate: LoudnessAggregate,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            loudness_tolerance_db: default_loudness_tolerance_db(),
            peak_margin_db: default_peak_margin_db(),
            max_iterations: default_max_iterations(),
            window_seconds: default_window_seconds(),
            tail_windows: default_tail_windows(),
            max_peak_cut_db: default_max_peak_cut_db(),
            loudness_aggregate: LoudnessAggregate::default(),
        }
    }
}

/// Advisory oracle backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Oracle that proposes the decision (oracle A)
    #[serde(default)]
    pub primary: Option<OracleEndpoint>,

    /// Oracle that reviews it (oracle B)
    #[serde(default)]
    pub reviewer: Option<OracleEndpoint>,
}

/// One text-generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleEndpoint {
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum spacing between requests (ms)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_loudness_tolerance_db() -> f64 {
    0.5
}

fn default_peak_margin_db() -> f64 {
    0.1
}

fn default_max_iterations() -> u32 {
    8
}

fn default_window_seconds() -> f64 {
    10.0
}

fn default_tail_windows() -> usize {
    3
}

fn default_max_peak_cut_db() -> Option<f64> {
    Some(3.0)
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_min_interval_ms() -> u64 {
    250
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve and load configuration, logging where it came from
    ///
    /// `cli_path` has highest priority; then the environment variable; then the
    /// platform config directory. When no file is found, defaults are returned.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::resolve(cli_path)?;
        source.log();
        Ok(config)
    }

    /// Resolve and load configuration without logging
    ///
    /// For callers that install the tracing subscriber from the loaded
    /// `[logging]` section and report the [`ConfigSource`] afterwards.
    pub fn resolve(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((Self::defaults_with_env(), ConfigSource::Missing(path))),
            None => Ok((Self::defaults_with_env(), ConfigSource::Defaults)),
        }
    }

    fn defaults_with_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Environment API keys replace keys read from TOML
    pub fn apply_env_overrides(&mut self) {
        if let Some(endpoint) = self.oracle.primary.as_mut() {
            if let Some(key) = non_empty_env(PRIMARY_API_KEY_ENV_VAR) {
                endpoint.api_key = Some(key);
            }
        }
        if let Some(endpoint) = self.oracle.reviewer.as_mut() {
            if let Some(key) = non_empty_env(REVIEWER_API_KEY_ENV_VAR) {
                endpoint.api_key = Some(key);
            }
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Pick the config file path by priority, without checking existence of the
/// explicit or environment-provided path
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = non_empty_env(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("mastering").join("config.toml"))
        .filter(|p| p.exists())
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Calling twice is harmless; the
/// second install is ignored.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
