//! Tracing-based logging initialization.
//!
//! Console output in a configurable format, plus optional daily-rotated
//! JSON file output through a non-blocking appender. The returned guard
//! must be held for the lifetime of the process when file output is
//! enabled; dropping it flushes and stops the background writer.

mod config;

pub use config::{FileConfig, LogFormat, LoggerConfig};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{AppError, AppResult};

/// Initializes the global tracing subscriber from configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logger(config: &LoggerConfig) -> AppResult<Option<WorkerGuard>> {
    config.validate().map_err(|e| AppError::Internal { source: e })?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = match config.format {
        LogFormat::Full => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };
    layers.push(console);

    let guard = if config.file.enabled {
        let appender =
            tracing_appender::rolling::daily(&config.file.directory, &config.file.file_name_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

    Ok(guard)
}
