//! Configuration settings structures for courier
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchOptions;
use crate::logger::LoggerConfig;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "courier".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_cron_expression() -> String {
    // every 30 seconds
    "*/30 * * * * *".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_batch_timeout() -> u64 {
    120
}

fn default_backoff_min() -> i64 {
    1
}

fn default_backoff_max() -> i64 {
    60
}

fn default_status_capacity() -> usize {
    256
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Dispatch Configuration
// ============================================================================

/// Dispatch pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Cron expression driving the pipeline cycle
    #[serde(default = "default_cron_expression")]
    pub cron_expression: String,

    /// Upper bound on messages collected per cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent provider batches per cycle
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Per-batch deadline in seconds
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_seconds: u64,

    /// Lower bound of the failure backoff jitter, in seconds
    #[serde(default = "default_backoff_min")]
    pub backoff_min_seconds: i64,

    /// Upper bound of the failure backoff jitter, in seconds
    #[serde(default = "default_backoff_max")]
    pub backoff_max_seconds: i64,

    /// Status channel capacity; slow subscribers lose the oldest updates
    #[serde(default = "default_status_capacity")]
    pub status_capacity: usize,
}

impl DispatchConfig {
    /// The cycle runner options this configuration describes
    pub fn options(&self) -> DispatchOptions {
        DispatchOptions {
            batch_size: self.batch_size,
            max_concurrent_batches: self.max_concurrent_batches,
            batch_timeout: Duration::from_secs(self.batch_timeout_seconds),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cron_expression: default_cron_expression(),
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            batch_timeout_seconds: default_batch_timeout(),
            backoff_min_seconds: default_backoff_min(),
            backoff_max_seconds: default_backoff_max(),
            status_capacity: default_status_capacity(),
        }
    }
}

// ============================================================================
// Root Settings
// ============================================================================

/// Root configuration for the gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logger: LoggerConfig,
}
