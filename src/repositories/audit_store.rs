//! Audit store contract: append-only.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{AuditEntry, NewAuditEntry};

/// Store contract for the append-only audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends an entry, stamping its creation time
    async fn create(&self, new_entry: NewAuditEntry) -> AppResult<AuditEntry>;

    /// All entries for a message, ordered by creation time
    async fn find_by_message(&self, message_id: i64) -> AppResult<Vec<AuditEntry>>;
}
