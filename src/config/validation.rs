//! Configuration validation logic
//!
//! Validation methods for the configuration structures, keeping loaded
//! values inside acceptable ranges before the pipeline starts.

use crate::config::error::ConfigError;
use crate::config::settings::{DispatchConfig, Settings};

impl DispatchConfig {
    /// Validate dispatch configuration
    ///
    /// # Validation Rules
    /// - Batch size must be greater than 0
    /// - Concurrent batch limit must be greater than 0
    /// - Batch timeout must be greater than 0
    /// - Backoff bounds must satisfy 1 <= min <= max
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::validation(
                "dispatch.batch_size",
                "Batch size must be greater than 0.",
            ));
        }

        if self.max_concurrent_batches == 0 {
            return Err(ConfigError::validation(
                "dispatch.max_concurrent_batches",
                "Concurrent batch limit must be greater than 0.",
            ));
        }

        if self.batch_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "dispatch.batch_timeout_seconds",
                "Batch timeout must be greater than 0 seconds.",
            ));
        }

        if self.backoff_min_seconds < 1 {
            return Err(ConfigError::validation(
                "dispatch.backoff_min_seconds",
                "Backoff lower bound must be at least 1 second.",
            ));
        }

        if self.backoff_max_seconds < self.backoff_min_seconds {
            return Err(ConfigError::validation(
                "dispatch.backoff_max_seconds",
                "Backoff upper bound must not be below the lower bound.",
            ));
        }

        if self.status_capacity == 0 {
            return Err(ConfigError::validation(
                "dispatch.status_capacity",
                "Status channel capacity must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate the full configuration tree
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()?;
        self.logger
            .validate()
            .map_err(|e| ConfigError::validation("logger", e.to_string().as_str()))?;
        Ok(())
    }
}
