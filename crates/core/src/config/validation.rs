//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_cache_size` is 0 or exceeds 4GiB
    /// - `retry_attempts` is 0 or exceeds 10
    /// - `retry_delay_ms` exceeds 10 seconds
    /// - `codec_chunk_size` is 0 or not a multiple of 3
    /// - `search_debounce_ms` exceeds 5 seconds
    /// - `header_offset` is negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cache_size == 0 {
            return Err(invalid("max_cache_size", "must be greater than 0"));
        }
        if self.max_cache_size > 4 * 1024 * 1024 * 1024 {
            return Err(invalid("max_cache_size", "must not exceed 4GiB"));
        }

        if self.retry_attempts == 0 {
            return Err(invalid("retry_attempts", "must be at least 1"));
        }
        if self.retry_attempts > 10 {
            return Err(invalid("retry_attempts", "must not exceed 10"));
        }
        if self.retry_delay_ms > 10_000 {
            return Err(invalid("retry_delay_ms", "must not exceed 10 seconds (10000ms)"));
        }

        if self.codec_chunk_size == 0 || self.codec_chunk_size % 3 != 0 {
            return Err(invalid("codec_chunk_size", "must be a positive multiple of 3"));
        }

        if self.search_debounce_ms > 5_000 {
            return Err(invalid("search_debounce_ms", "must not exceed 5 seconds (5000ms)"));
        }

        if !self.header_offset.is_finite() || self.header_offset < 0.0 {
            return Err(invalid("header_offset", "must be a non-negative number"));
        }

        if self.verify_content && self.max_cache_size > 1024 * 1024 * 1024 {
            tracing::warn!(
                max_cache_size = self.max_cache_size,
                "verify_content hashes every put; large budgets make re-puts expensive"
            );
        }

        Ok(())
    }
}
