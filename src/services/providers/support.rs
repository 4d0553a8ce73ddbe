//! Shared provider behavior.
//!
//! The defensive guards and the success/failure bookkeeping every concrete
//! provider needs, implemented once as a composition helper over the state
//! authority. Each helper resolves to a per-message outcome and never
//! propagates a storage error out of the batch loop: a message whose
//! bookkeeping fails is reported Indeterminate and re-evaluated on the next
//! scheduling pass.

use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Attachment, MailDetail, Message, Provider, TextDetail};
use crate::repositories::MessageStore;
use crate::services::providers::provider::{DispatchOutcome, DispatchStatus};
use crate::services::state_service::MessageStateService;

/// Diagnostic recorded when a batch contains a message of the wrong kind.
pub const WRONG_KIND_DIAGNOSTIC: &str = "message kind does not match provider capability";

/// Diagnostic recorded when a message's kind-specific payload is missing.
pub const MISSING_DETAIL_DIAGNOSTIC: &str = "message payload could not be located";

/// Composition helper giving concrete providers the shared guard and
/// bookkeeping paths.
#[derive(Clone)]
pub struct ProviderSupport {
    state: Arc<MessageStateService>,
    messages: Arc<dyn MessageStore>,
}

impl ProviderSupport {
    pub fn new(state: Arc<MessageStateService>, messages: Arc<dyn MessageStore>) -> Self {
        Self { state, messages }
    }

    // ========================================================================
    // Payload lookups
    // ========================================================================

    pub async fn mail_detail(&self, message_id: i64) -> AppResult<Option<MailDetail>> {
        self.messages.find_mail_detail(message_id).await
    }

    pub async fn text_detail(&self, message_id: i64) -> AppResult<Option<TextDetail>> {
        self.messages.find_text_detail(message_id).await
    }

    pub async fn attachments(&self, message_id: i64) -> AppResult<Vec<Attachment>> {
        self.messages.find_attachments(message_id).await
    }

    // ========================================================================
    // Per-message paths
    // ========================================================================

    /// Wrong-type guard: the message cannot be handled by this batch at
    /// all. Returned to Pending so a correctly matched provider retries it.
    pub async fn reject_wrong_kind(&self, message: Message, entry: &Provider) -> DispatchOutcome {
        self.reject(message, entry, WRONG_KIND_DIAGNOSTIC).await
    }

    /// Missing-detail guard: the payload for a correctly typed message
    /// could not be located. Treated as a transient consistency problem,
    /// not a delivery failure.
    pub async fn reject_missing_detail(
        &self,
        message: Message,
        entry: &Provider,
    ) -> DispatchOutcome {
        self.reject(message, entry, MISSING_DETAIL_DIAGNOSTIC).await
    }

    /// Success path.
    pub async fn complete(&self, message: Message, entry: &Provider) -> DispatchOutcome {
        let key = message.message_key.clone();
        match self.state.to_sent_state(message, Some(entry)).await {
            Ok(_) => DispatchOutcome::new(key, DispatchStatus::Sent),
            Err(e) => self.indeterminate(key, entry, &e),
        }
    }

    /// Failure path: transport-level delivery failure with backoff.
    pub async fn fail(&self, message: Message, entry: &Provider, detail: &str) -> DispatchOutcome {
        let key = message.message_key.clone();
        match self.state.to_failed_state(message, Some(entry), detail).await {
            Ok(_) => DispatchOutcome::with_detail(key, DispatchStatus::Failed, detail),
            Err(e) => self.indeterminate(key, entry, &e),
        }
    }

    /// Releases a message this batch never attempted (cancellation) back to
    /// Pending.
    pub async fn release(&self, message: Message, entry: &Provider) -> DispatchOutcome {
        let key = message.message_key.clone();
        match self.state.to_pending_state(message).await {
            Ok(_) => DispatchOutcome::new(key, DispatchStatus::Skipped),
            Err(e) => self.indeterminate(key, entry, &e),
        }
    }

    async fn reject(&self, message: Message, entry: &Provider, diagnostic: &str) -> DispatchOutcome {
        let key = message.message_key.clone();
        match self
            .state
            .reject_to_pending(message, Some(entry), diagnostic)
            .await
        {
            Ok(_) => DispatchOutcome::with_detail(key, DispatchStatus::Returned, diagnostic),
            Err(e) => self.indeterminate(key, entry, &e),
        }
    }

    /// Outcome for a message whose bookkeeping or payload lookup hit a
    /// storage error; logged and reported, never propagated.
    pub fn indeterminate(
        &self,
        key: String,
        entry: &Provider,
        error: &crate::error::AppError,
    ) -> DispatchOutcome {
        tracing::warn!(
            message_key = %key,
            provider = %entry.name,
            error = %error,
            "bookkeeping failed; message state is indeterminate"
        );
        DispatchOutcome::with_detail(key, DispatchStatus::Indeterminate, error.to_string())
    }
}
