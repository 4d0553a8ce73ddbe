//! Message models for the dispatch pipeline.
//!
//! A message is a common record carrying lifecycle fields plus a `kind`
//! discriminator; the kind-specific payload (mail envelope data or text
//! recipient/body) is stored and fetched separately so a payload lookup can
//! fail independently of the message record itself.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Reserved property name mirroring the provider assignment.
///
/// The `assigned_provider` field is authoritative; this property is written
/// on assignment and removed whenever the field is cleared, for
/// collaborators that locate owned messages by property search.
pub const ASSIGNED_PROVIDER_PROPERTY: &str = "assigned-provider";

// ============================================================================
// Enums
// ============================================================================

/// The kind of transport a message requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Mail,
    Text,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Mail
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Mail => write!(f, "mail"),
            MessageKind::Text => write!(f, "text"),
        }
    }
}

/// Lifecycle state of a message.
///
/// Sent and Failed are terminal; Failed is re-enterable via an explicit
/// administrative reset. Retrying is part of the persisted state set but no
/// pipeline transition targets it (re-enqueue policy lives outside the core).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Pending,
    Processing,
    Retrying,
    Sent,
    Failed,
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageState::Pending => write!(f, "pending"),
            MessageState::Processing => write!(f, "processing"),
            MessageState::Retrying => write!(f, "retrying"),
            MessageState::Sent => write!(f, "sent"),
            MessageState::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// Message (common record)
// ============================================================================

/// Message query model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Externally addressable key; unique, assigned at creation, immutable
    pub message_key: String,
    pub kind: MessageKind,
    pub state: MessageState,
    /// Disabled messages are never picked up regardless of state
    pub is_disabled: bool,
    /// Lower is more urgent
    pub priority: i32,
    /// Incremented on every failed attempt; cleared only by a full
    /// administrative reset
    pub error_count: i32,
    /// Catalog id of the provider that currently owns this message
    pub assigned_provider: Option<i64>,
    /// Earliest pickup time; nudged forward by jittered backoff on failure
    pub process_after: Option<Timestamp>,
    /// Retention gate; shifted by the same backoff delta when present
    pub archive_after: Option<Timestamp>,
    pub properties: HashMap<String, String>,
    pub created_at: Timestamp,
}

/// NewMessage insert model
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    /// Explicit key; the store assigns a UUID when unset
    pub message_key: Option<String>,
    pub kind: MessageKind,
    pub priority: i32,
    pub process_after: Option<Timestamp>,
    pub archive_after: Option<Timestamp>,
    pub properties: HashMap<String, String>,
}

impl NewMessage {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

// ============================================================================
// Kind-specific payloads
// ============================================================================

/// Mail payload; recipient lists are `;`-joined address strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailDetail {
    pub message_id: i64,
    pub from: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
}

/// Text payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDetail {
    pub message_id: i64,
    pub phone_number: String,
    pub body: String,
}

/// Kind-tagged payload used at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageDetail {
    Mail(MailDetail),
    Text(TextDetail),
}

impl MessageDetail {
    pub fn message_id(&self) -> i64 {
        match self {
            MessageDetail::Mail(detail) => detail.message_id,
            MessageDetail::Text(detail) => detail.message_id,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessageDetail::Mail(_) => MessageKind::Mail,
            MessageDetail::Text(_) => MessageKind::Text,
        }
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// Binary attachment owned exclusively by its message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub message_id: i64,
    pub file_name: String,
    /// Declared MIME classification, e.g. "application/pdf"
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// NewAttachment insert model
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub message_id: i64,
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(MessageState::Pending.to_string(), "pending");
        assert_eq!(MessageState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_kind_serde_roundtrip() {
        let json = serde_json::to_string(&MessageKind::Text).unwrap();
        assert_eq!(json, "\"text\"");
        let kind: MessageKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, MessageKind::Text);
    }

    #[test]
    fn test_detail_kind_matches_variant() {
        let detail = MessageDetail::Text(TextDetail {
            message_id: 7,
            phone_number: "+15550100".to_string(),
            body: "hi".to_string(),
        });
        assert_eq!(detail.kind(), MessageKind::Text);
        assert_eq!(detail.message_id(), 7);
    }
}
