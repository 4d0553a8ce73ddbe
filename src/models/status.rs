//! Status record published on terminal message outcomes.

use serde::{Deserialize, Serialize};

/// Minimal status record delivered to subscribers on terminal events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// The message's externally addressable key
    pub key: String,
    pub sent: bool,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn success(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sent: true,
            error: None,
        }
    }

    pub fn failure(key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sent: false,
            error: Some(error.into()),
        }
    }
}
