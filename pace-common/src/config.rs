//! Configuration loading and root folder resolution
//!
//! Configuration comes from a TOML file with defaults for every field, so a
//! missing or partial file never prevents startup. Root folder resolution
//! follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `PACE_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PACE_ROOT_FOLDER";

/// Environment variable overriding the lookup service URL
pub const LOOKUP_URL_ENV: &str = "PACE_LOOKUP_URL";

/// File name of the tempo cache database inside the root folder
pub const DATABASE_FILE_NAME: &str = "tempo_cache.db";

const DEFAULT_LOOKUP_URL: &str = "https://bpm.aws.roehl.rocks/v1/lookup";

/// Top-level configuration for the tempo subsystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Folder holding the tempo cache database
    pub root_folder: Option<PathBuf>,
    pub lookup: LookupConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Remote BPM lookup service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Endpoint accepting a POSTed JSON array of lookup records
    pub url: String,
    /// Whole request/response timeout. Deep lookups can be large, so this is long.
    pub timeout_secs: u64,
    /// Outbound request budget
    pub requests_per_second: u32,
    /// Total attempts per deep lookup, including the first
    pub max_attempts: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOOKUP_URL.to_string(),
            timeout_secs: 120,
            requests_per_second: 4,
            max_attempts: 10,
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Batch scheduler flush triggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Flush as soon as this many items are waiting
    pub size: usize,
    /// Flush this long after the first item of a batch arrived
    pub max_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 15,
            max_delay_ms: 1000,
        }
    }
}

impl BatchConfig {
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter directive (overridden by RUST_LOG)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TempoConfig {
    /// Load configuration from `path`, or from the platform config file when `None`.
    ///
    /// A missing file yields defaults with a warning. A file that exists but
    /// cannot be parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(LOOKUP_URL_ENV) {
            if !url.trim().is_empty() {
                debug!(url = %url, "Lookup URL overridden from environment");
                self.lookup.url = url;
            }
        }
    }

    /// Reject values the scheduler and lookup client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.batch.size == 0 {
            return Err(Error::Config("batch.size must be greater than 0".to_string()));
        }
        if self.batch.max_delay_ms == 0 {
            return Err(Error::Config(
                "batch.max_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.lookup.max_attempts == 0 {
            return Err(Error::Config(
                "lookup.max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.lookup.requests_per_second == 0 {
            return Err(Error::Config(
                "lookup.requests_per_second must be greater than 0".to_string(),
            ));
        }
        if self.lookup.url.trim().is_empty() {
            return Err(Error::Config("lookup.url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the root folder using the documented priority order
    pub fn resolve_root_folder(&self, cli_arg: Option<&Path>) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.root_folder {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// Platform config file location (`<config dir>/pace/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pace").join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pace"))
        .unwrap_or_else(|| PathBuf::from("./pace_data"))
}

/// Tempo cache database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}
