use thiserror::Error;

/// Application-wide error type that represents all possible errors in the system.
///
/// This enum provides structured error handling for the dispatch pipeline,
/// with automatic conversion from anyhow and detailed context for operator
/// diagnostics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Duplicate entry error for unique constraint violations
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Provider configuration error. Fatal to an entire batch: no message
    /// may be attempted when the transport cannot be constructed.
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Storage operation error with operation context
    #[error("Storage operation failed: {operation}")]
    Storage {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Transport-level delivery failure (protocol error, rejected
    /// recipient, transient network error)
    #[error("Transport failure: {detail}")]
    Transport { detail: String },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Create a storage error with operation context
    pub fn storage<E: Into<anyhow::Error>>(operation: impl Into<String>, source: E) -> Self {
        AppError::Storage {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Create a configuration error for a missing or invalid key
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Configuration {
            key: key.into(),
            source: anyhow::anyhow!(reason.into()),
        }
    }

    /// The failure detail to record against a message when delivery fails.
    ///
    /// Transport errors carry the raw detail from the transport client;
    /// everything else falls back to the display form.
    pub fn failure_detail(&self) -> String {
        match self {
            AppError::Transport { detail } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
