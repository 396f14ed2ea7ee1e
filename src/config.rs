//! Configuration module for feeder.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{FeederError, Result};

/// Name of the source list file inside the data directory.
pub const SOURCELIST_FILE_NAME: &str = "sourcelist.conf";

/// Data directory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory holding the source list and per-source article files.
    #[serde(default = "default_data_dir")]
    pub dir: String,
    /// Explicit source list path. Defaults to `<dir>/sourcelist.conf`.
    #[serde(default)]
    pub sourcelist: Option<String>,
    /// Start a fresh source list when the existing one cannot be loaded.
    ///
    /// The unreadable file is moved aside to a backup first.
    #[serde(default)]
    pub recreate_on_load_failure: bool,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl DataConfig {
    /// Path of the source list file.
    pub fn sourcelist_path(&self) -> PathBuf {
        match &self.sourcelist {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.dir).join(SOURCELIST_FILE_NAME),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            sourcelist: None,
            recreate_on_load_failure: false,
        }
    }
}

/// Feed fetching configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total time allowed for one source refresh, in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Number of feeds fetched at the same time during a batch refresh.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_concurrent() -> usize {
    4
}

fn default_user_agent() -> String {
    format!("feeder/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            max_concurrent: default_max_concurrent(),
            user_agent: default_user_agent(),
        }
    }
}

/// Display configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Timezone for displaying dates (e.g., "Europe/Berlin", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feeder.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Data directory configuration.
    #[serde(default)]
    pub data: DataConfig,
    /// Feed fetching configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Display configuration.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeederError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeederError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDER_DATA_DIR`: Override the data directory
    /// - `FEEDER_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("FEEDER_DATA_DIR") {
            if !dir.is_empty() {
                self.data.dir = dir;
            }
        }
        if let Ok(level) = std::env::var("FEEDER_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.data.dir.trim().is_empty() {
            return Err(FeederError::Config("data.dir must not be empty".to_string()));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(FeederError::Config(
                "fetch.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.fetch.total_timeout_secs == 0 {
            return Err(FeederError::Config(
                "fetch.total_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.display.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(FeederError::Config(format!(
                "unknown timezone: {}",
                self.display.timezone
            )));
        }
        Ok(())
    }
}
