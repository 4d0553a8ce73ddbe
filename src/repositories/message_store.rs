//! Message store contract.
//!
//! The pipeline consumes this trait; it never implements persistence
//! itself. Concurrent updates to the same message must be serialized by the
//! implementation; updates to different messages need no cross-message
//! locking.

use async_trait::async_trait;
use jiff::Timestamp;

use crate::error::AppResult;
use crate::models::{
    Attachment, MailDetail, Message, MessageDetail, NewAttachment, NewMessage, TextDetail,
};

/// Store contract for messages, their kind-specific payloads, and their
/// attachments.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Creates a message, assigning its id and (when unset) its unique key
    async fn create(&self, new_message: NewMessage) -> AppResult<Message>;

    async fn find_by_id(&self, message_id: i64) -> AppResult<Option<Message>>;

    async fn find_by_key(&self, key: &str) -> AppResult<Option<Message>>;

    /// Persists the message's current field values, matched by id
    async fn update(&self, message: &Message) -> AppResult<Message>;

    /// Deletes a message together with its payload and attachments
    async fn delete(&self, message_id: i64) -> AppResult<bool>;

    /// All Pending messages with `process_after <= now` (or unset) and
    /// `is_disabled == false`, ordered by priority ascending then id
    async fn find_due_pending(&self, now: Timestamp) -> AppResult<Vec<Message>>;

    async fn create_detail(&self, detail: MessageDetail) -> AppResult<()>;

    async fn find_mail_detail(&self, message_id: i64) -> AppResult<Option<MailDetail>>;

    async fn find_text_detail(&self, message_id: i64) -> AppResult<Option<TextDetail>>;

    async fn create_attachment(&self, new_attachment: NewAttachment) -> AppResult<Attachment>;

    /// Attachments for a message, ordered by id
    async fn find_attachments(&self, message_id: i64) -> AppResult<Vec<Attachment>>;
}
