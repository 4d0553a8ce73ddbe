//! Dispatch provider runtime contract.
//!
//! Every transport implements `DispatchProvider`. The call is batch-shaped
//! so a provider can amortize one transport-level connection across many
//! messages; partial failure is expected and never aborts the remainder of
//! a batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::models::{Message, MessageKind, Provider};

/// Per-message result within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// Delivered; message moved to Sent
    Sent,
    /// Transport failure; message moved to Failed with backoff
    Failed,
    /// Misrouted (wrong kind or missing payload); message returned to Pending
    Returned,
    /// Batch was cancelled before this message was attempted; message
    /// released back to Pending, no delivery attempt recorded
    Skipped,
    /// Bookkeeping hit a storage error; the message's persisted state is
    /// unknown and will be re-evaluated on the next scheduling pass
    Indeterminate,
}

/// Outcome of one message within a provider batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub message_key: String,
    pub status: DispatchStatus,
    pub detail: Option<String>,
}

impl DispatchOutcome {
    pub fn new(message_key: impl Into<String>, status: DispatchStatus) -> Self {
        Self {
            message_key: message_key.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(
        message_key: impl Into<String>,
        status: DispatchStatus,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            message_key: message_key.into(),
            status,
            detail: Some(detail.into()),
        }
    }
}

/// Trait every transport provider implements.
///
/// A batch-fatal error (provider configuration, transport construction)
/// must be returned as `Err` BEFORE any per-message mutation; once the
/// per-message loop starts, each message resolves to its own outcome.
#[async_trait]
pub trait DispatchProvider: Send + Sync {
    /// Implementation selector this provider registers under; catalog
    /// entries reference it in their `implementation` field
    fn name(&self) -> &'static str;

    /// The message kind a batch for this provider is expected to contain
    fn kind(&self) -> MessageKind;

    /// Processes a batch of messages owned by `entry`.
    ///
    /// Cancellation is observed between messages: already-completed
    /// messages keep their new states, the not-yet-attempted remainder is
    /// released.
    async fn process_messages(
        &self,
        messages: Vec<Message>,
        entry: &Provider,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<DispatchOutcome>>;
}
