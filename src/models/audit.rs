//! Audit log models.
//!
//! Audit entries are append-only: created by the state authority and by
//! providers, never updated or deleted in normal operation.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::message::MessageState;

/// Kind of audited event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEvent {
    Stored,
    Assigned,
    Reset,
    Disabled,
    Enabled,
    Sent,
    Error,
}

impl std::fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEvent::Stored => write!(f, "stored"),
            AuditEvent::Assigned => write!(f, "assigned"),
            AuditEvent::Reset => write!(f, "reset"),
            AuditEvent::Disabled => write!(f, "disabled"),
            AuditEvent::Enabled => write!(f, "enabled"),
            AuditEvent::Sent => write!(f, "sent"),
            AuditEvent::Error => write!(f, "error"),
        }
    }
}

/// Audit entry query model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub message_id: i64,
    /// Provider attribution, when a provider was involved
    pub provider_id: Option<i64>,
    pub event: AuditEvent,
    /// Unset for events that are not state transitions
    pub before_state: Option<MessageState>,
    pub after_state: Option<MessageState>,
    /// Free-text error detail for Error events
    pub detail: Option<String>,
    pub created_at: Timestamp,
}

/// NewAuditEntry insert model
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub message_id: i64,
    pub provider_id: Option<i64>,
    pub event: AuditEvent,
    pub before_state: Option<MessageState>,
    pub after_state: Option<MessageState>,
    pub detail: Option<String>,
}
