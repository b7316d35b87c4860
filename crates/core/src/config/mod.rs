//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DOCSHELF_*)
//! 2. TOML config file (if DOCSHELF_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::codec::DEFAULT_CHUNK_SIZE;
use crate::cache::manager::DEFAULT_MAX_CACHE_SIZE;
use crate::cache::retry::{DEFAULT_ATTEMPTS, RetryPolicy};
use crate::cache::CacheConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DOCSHELF_*)
/// 2. TOML config file (if DOCSHELF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via DOCSHELF_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache byte budget.
    ///
    /// Set via DOCSHELF_MAX_CACHE_SIZE environment variable.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: u64,

    /// Attempts per storage call before degrading to a miss.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between storage attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Bytes per base64 encode chunk. Must be a multiple of 3.
    #[serde(default = "default_codec_chunk_size")]
    pub codec_chunk_size: usize,

    /// Compare content hashes instead of sizes on re-put.
    #[serde(default)]
    pub verify_content: bool,

    /// Delay before a keyword change rebuilds the search index.
    ///
    /// Set via DOCSHELF_SEARCH_DEBOUNCE_MS environment variable.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Height of a sticky header to keep scrolled matches clear of.
    #[serde(default)]
    pub header_offset: f32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./docshelf-cache.sqlite")
}

fn default_max_cache_size() -> u64 {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_retry_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_codec_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_search_debounce_ms() -> u64 {
    150
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_cache_size: default_max_cache_size(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            codec_chunk_size: default_codec_chunk_size(),
            verify_content: false,
            search_debounce_ms: default_search_debounce_ms(),
            header_offset: 0.0,
        }
    }
}

impl AppConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// The cache-facing subset of the configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_cache_size: self.max_cache_size,
            retry: RetryPolicy::new(self.retry_attempts, self.retry_delay()),
            codec_chunk_size: self.codec_chunk_size,
            verify_content: self.verify_content,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DOCSHELF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DOCSHELF_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
