//! Configuration loader for courier
//!
//! This module provides the `ConfigLoader` struct that handles loading
//! configuration from multiple sources with proper precedence.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "COURIER_CONFIG_DIR";

/// Environment variable for specific configuration file
const CONFIG_FILE_ENV: &str = "COURIER_CONFIG_FILE";

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "COURIER";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// The loader supports the following configuration sources (in order of
/// priority):
/// 1. `default.toml` - Base default configuration (optional; serde defaults
///    cover a fully absent tree)
/// 2. `{environment}.toml` - Environment-specific configuration (optional)
/// 3. `local.toml` - Local development overrides (optional)
/// 4. `COURIER_*` environment variables (highest priority)
#[derive(Debug)]
pub struct ConfigLoader {
    /// Configuration directory path
    config_dir: PathBuf,
    /// Specific configuration file path (if set, skips layered loading)
    config_file: Option<PathBuf>,
    /// Current application environment
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a new configuration loader
    ///
    /// This reads environment variables to determine:
    /// - Configuration directory (`COURIER_CONFIG_DIR`)
    /// - Specific configuration file (`COURIER_CONFIG_FILE`)
    /// - Application environment (`COURIER_APP_ENV`)
    ///
    /// # Errors
    ///
    /// Returns an error if both `COURIER_CONFIG_DIR` and
    /// `COURIER_CONFIG_FILE` are set, as they are mutually exclusive.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        // Check mutual exclusivity
        if config_file.is_some() && std::env::var(CONFIG_DIR_ENV).is_ok() {
            return Err(ConfigError::mutual_exclusivity(
                "COURIER_CONFIG_DIR and COURIER_CONFIG_FILE cannot both be set. \
                 Use COURIER_CONFIG_DIR for layered configuration or \
                 COURIER_CONFIG_FILE for a single configuration file.",
            ));
        }

        let environment = AppEnvironment::from_env();

        Ok(Self {
            config_dir,
            config_file,
            environment,
        })
    }

    /// Create a loader for a single configuration file, skipping layering
    pub fn with_config_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path.into()),
            environment: AppEnvironment::from_env(),
        }
    }

    /// Create a loader over an explicit configuration directory
    pub fn with_config_dir(path: impl Into<PathBuf>, environment: AppEnvironment) -> Self {
        Self {
            config_dir: path.into(),
            config_file: None,
            environment,
        }
    }

    /// Load and validate settings from the configured sources
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = &self.config_file {
            if !file.exists() {
                return Err(ConfigError::file_not_found(file.display().to_string()));
            }
            builder = builder.add_source(
                File::from(file.clone()).format(FileFormat::Toml).required(true),
            );
        } else {
            builder = builder
                .add_source(File::from(self.config_dir.join("default.toml")).required(false))
                .add_source(
                    File::from(
                        self.config_dir
                            .join(format!("{}.toml", self.environment.as_str())),
                    )
                    .required(false),
                )
                .add_source(File::from(self.config_dir.join("local.toml")).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_single_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[application]
name = "courier-test"

[dispatch]
batch_size = 25
backoff_min_seconds = 2
backoff_max_seconds = 8
"#
        )
        .unwrap();

        let settings = ConfigLoader::with_config_file(file.path()).load().unwrap();
        assert_eq!(settings.application.name, "courier-test");
        assert_eq!(settings.dispatch.batch_size, 25);
        assert_eq!(settings.dispatch.backoff_min_seconds, 2);
        // untouched keys fall back to defaults
        assert_eq!(settings.dispatch.max_concurrent_batches, 4);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ConfigLoader::with_config_file("/nonexistent/courier.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_values_rejected_on_load() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[dispatch]
backoff_min_seconds = 30
backoff_max_seconds = 5
"#
        )
        .unwrap();

        let err = ConfigLoader::with_config_file(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_layered_directory_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[dispatch]\nbatch_size = 10\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("test.toml"),
            "[dispatch]\nbatch_size = 3\n",
        )
        .unwrap();

        let settings = ConfigLoader::with_config_dir(dir.path(), AppEnvironment::Test)
            .load()
            .unwrap();
        assert_eq!(settings.dispatch.batch_size, 3);
    }
}
