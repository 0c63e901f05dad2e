//! Configuration management for the trend function engine
//!
//! TOML configuration files with environment variable overrides and
//! sensible defaults.
//!
//! ```toml
//! [cache]
//! size_bytes = 4194304
//!
//! [logging]
//! log_level = "info"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One kibibyte
pub const KIBIBYTE: u64 = 1024;

/// One mebibyte
pub const MEBIBYTE: u64 = 1024 * KIBIBYTE;

/// One gibibyte
pub const GIBIBYTE: u64 = 1024 * MEBIBYTE;

/// Smallest non-zero trend function cache size
pub const MIN_CACHE_SIZE: u64 = 128 * KIBIBYTE;

/// Largest trend function cache size
pub const MAX_CACHE_SIZE: u64 = 2 * GIBIBYTE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Trend function cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Trend function cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Cache size in bytes, 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub size_bytes: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cache_size() -> u64 {
    4 * MEBIBYTE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_bytes: default_cache_size(),
        }
    }
}

impl CacheConfig {
    /// Cache configuration with the given size
    pub fn new(size_bytes: u64) -> Self {
        Self { size_bytes }
    }

    /// Configuration with caching turned off
    pub fn disabled() -> Self {
        Self { size_bytes: 0 }
    }

    /// True when the cache is turned off
    pub fn is_disabled(&self) -> bool {
        self.size_bytes == 0
    }

    /// Check the size is 0 or within the supported range
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.size_bytes != 0 && !(MIN_CACHE_SIZE..=MAX_CACHE_SIZE).contains(&self.size_bytes) {
            return Err(ValidationError::OutOfRange {
                field: "cache.size_bytes".to_string(),
                value: self.size_bytes.to_string(),
                min: MIN_CACHE_SIZE.to_string(),
                max: MAX_CACHE_SIZE.to_string(),
            });
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("TFC_CACHE_SIZE") {
            if let Ok(s) = size.parse() {
                self.cache.size_bytes = s;
            }
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.cache.validate()?;

        if self.logging.log_level.trim().is_empty() {
            return Err(ValidationError::Failed("log level cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<(), String> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file {}: {}", path, e))
    }
}
