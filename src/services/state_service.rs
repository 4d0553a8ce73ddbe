//! Message state authority.
//!
//! The only component permitted to mutate a message's lifecycle fields.
//! Every transition persists the message, appends an audit entry, and (for
//! terminal outcomes) publishes a status update. Callers must treat the
//! message they hold as indeterminate after a storage error; retry belongs
//! to the next pipeline cycle, not to this service.

use std::sync::Arc;

use jiff::{Span, Timestamp};

use crate::error::{AppError, AppResult};
use crate::models::{
    ASSIGNED_PROVIDER_PROPERTY, AuditEvent, Message, MessageDetail, MessageState, NewAttachment,
    NewAuditEntry, NewMessage, Provider, StatusUpdate,
};
use crate::repositories::{AuditStore, MessageStore};
use crate::services::jitter::{Jitter, UniformJitter};
use crate::services::status_publisher::StatusPublisher;

/// State authority over message lifecycle fields.
#[derive(Clone)]
pub struct MessageStateService {
    messages: Arc<dyn MessageStore>,
    audit: Arc<dyn AuditStore>,
    publisher: StatusPublisher,
    jitter: Arc<dyn Jitter>,
}

impl MessageStateService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        audit: Arc<dyn AuditStore>,
        publisher: StatusPublisher,
    ) -> Self {
        Self::with_jitter(messages, audit, publisher, Arc::new(UniformJitter::default()))
    }

    /// Creates the service with an explicit backoff jitter source.
    pub fn with_jitter(
        messages: Arc<dyn MessageStore>,
        audit: Arc<dyn AuditStore>,
        publisher: StatusPublisher,
        jitter: Arc<dyn Jitter>,
    ) -> Self {
        Self {
            messages,
            audit,
            publisher,
            jitter,
        }
    }

    // ========================================================================
    // Intake and administrative operations
    // ========================================================================

    /// Persists a newly created message with its payload and attachments,
    /// and appends the Stored audit entry.
    ///
    /// The payload's kind must match the message's kind; its message id is
    /// overwritten with the id the store assigns.
    pub async fn store_message(
        &self,
        new_message: NewMessage,
        detail: MessageDetail,
        attachments: Vec<NewAttachment>,
    ) -> AppResult<Message> {
        if detail.kind() != new_message.kind {
            return Err(AppError::Validation {
                field: "detail".to_string(),
                reason: format!(
                    "payload kind {} does not match message kind {}",
                    detail.kind(),
                    new_message.kind
                ),
            });
        }

        let message = self.messages.create(new_message).await?;

        let detail = match detail {
            MessageDetail::Mail(mut mail) => {
                mail.message_id = message.id;
                MessageDetail::Mail(mail)
            }
            MessageDetail::Text(mut text) => {
                text.message_id = message.id;
                MessageDetail::Text(text)
            }
        };
        self.messages.create_detail(detail).await?;

        for mut attachment in attachments {
            attachment.message_id = message.id;
            self.messages.create_attachment(attachment).await?;
        }

        self.record(
            &message,
            None,
            AuditEvent::Stored,
            None,
            Some(message.state),
            None,
        )
        .await?;

        Ok(message)
    }

    /// Flips the disabled gate and appends a Disabled/Enabled audit entry.
    /// Not a state transition; before/after are left unset.
    pub async fn set_disabled(&self, mut message: Message, disabled: bool) -> AppResult<Message> {
        message.is_disabled = disabled;
        let message = self.messages.update(&message).await?;

        let event = if disabled {
            AuditEvent::Disabled
        } else {
            AuditEvent::Enabled
        };
        self.record(&message, None, event, None, None, None).await?;

        Ok(message)
    }

    // ========================================================================
    // Lifecycle transitions
    // ========================================================================

    /// Increments the error count and persists. No state change and no
    /// audit entry by itself; callers combine it with a transition.
    pub async fn bump_error_count(&self, mut message: Message) -> AppResult<Message> {
        message.error_count += 1;
        self.messages.update(&message).await
    }

    /// Returns a message to Pending, clearing its provider assignment.
    ///
    /// Appends a Reset audit entry. Does NOT clear the error count; the
    /// error-clearing full reset is an administrative catalog action, not a
    /// pipeline transition.
    pub async fn to_pending_state(&self, mut message: Message) -> AppResult<Message> {
        let before = message.state;
        let actor = message.assigned_provider;
        clear_assignment(&mut message);
        message.state = MessageState::Pending;
        let message = self.messages.update(&message).await?;

        self.record(
            &message,
            actor,
            AuditEvent::Reset,
            Some(before),
            Some(message.state),
            None,
        )
        .await?;

        Ok(message)
    }

    /// Accepts ownership: tags the message with the provider and moves it
    /// to Processing. Appends an Assigned audit entry.
    ///
    /// The `assigned_provider` field is authoritative; the reserved
    /// property is mirrored for collaborators that search by property.
    pub async fn to_processing_state(
        &self,
        mut message: Message,
        provider: &Provider,
    ) -> AppResult<Message> {
        let before = message.state;
        message.assigned_provider = Some(provider.id);
        message
            .properties
            .insert(ASSIGNED_PROVIDER_PROPERTY.to_string(), provider.name.clone());
        message.state = MessageState::Processing;
        let message = self.messages.update(&message).await?;

        self.record(
            &message,
            Some(provider.id),
            AuditEvent::Assigned,
            Some(before),
            Some(message.state),
            None,
        )
        .await?;

        Ok(message)
    }

    /// Terminal success: moves the message to Sent, releases the provider
    /// assignment, appends a Sent audit entry, and publishes a success
    /// status.
    pub async fn to_sent_state(
        &self,
        mut message: Message,
        provider: Option<&Provider>,
    ) -> AppResult<Message> {
        let before = message.state;
        let actor = provider.map(|p| p.id).or(message.assigned_provider);
        clear_assignment(&mut message);
        message.state = MessageState::Sent;
        let message = self.messages.update(&message).await?;

        self.record(
            &message,
            actor,
            AuditEvent::Sent,
            Some(before),
            Some(message.state),
            None,
        )
        .await?;

        self.publisher
            .publish(StatusUpdate::success(&message.message_key));

        Ok(message)
    }

    /// Terminal failure: releases the provider assignment, increments the
    /// error count, moves the message to Failed, pushes `process_after`
    /// forward by a jittered delay (and `archive_after` by the same delta
    /// when set, preserving relative retention), appends an Error audit
    /// entry, and publishes a failure status.
    pub async fn to_failed_state(
        &self,
        mut message: Message,
        provider: Option<&Provider>,
        error_detail: &str,
    ) -> AppResult<Message> {
        let before = message.state;
        let actor = provider.map(|p| p.id).or(message.assigned_provider);
        clear_assignment(&mut message);
        message.error_count += 1;
        message.state = MessageState::Failed;

        let backoff = Span::new().seconds(self.jitter.delay_seconds());
        let base = message.process_after.unwrap_or_else(Timestamp::now);
        message.process_after = Some(advance(base, backoff)?);
        if let Some(archive) = message.archive_after {
            message.archive_after = Some(advance(archive, backoff)?);
        }

        let message = self.messages.update(&message).await?;

        self.record(
            &message,
            actor,
            AuditEvent::Error,
            Some(before),
            Some(message.state),
            Some(error_detail.to_string()),
        )
        .await?;

        self.publisher
            .publish(StatusUpdate::failure(&message.message_key, error_detail));

        Ok(message)
    }

    /// Misrouting path: returns the message to Pending so a correctly
    /// matched provider can pick it up, incrementing the error count and
    /// appending exactly one Error audit entry with the diagnostic.
    ///
    /// Not a delivery failure: no backoff is applied and no status is
    /// published.
    pub async fn reject_to_pending(
        &self,
        mut message: Message,
        provider: Option<&Provider>,
        diagnostic: &str,
    ) -> AppResult<Message> {
        let before = message.state;
        let actor = provider.map(|p| p.id).or(message.assigned_provider);
        clear_assignment(&mut message);
        message.error_count += 1;
        message.state = MessageState::Pending;
        let message = self.messages.update(&message).await?;

        self.record(
            &message,
            actor,
            AuditEvent::Error,
            Some(before),
            Some(message.state),
            Some(diagnostic.to_string()),
        )
        .await?;

        Ok(message)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    async fn record(
        &self,
        message: &Message,
        provider_id: Option<i64>,
        event: AuditEvent,
        before_state: Option<MessageState>,
        after_state: Option<MessageState>,
        detail: Option<String>,
    ) -> AppResult<()> {
        self.audit
            .create(NewAuditEntry {
                message_id: message.id,
                provider_id,
                event,
                before_state,
                after_state,
                detail,
            })
            .await?;
        Ok(())
    }
}

fn clear_assignment(message: &mut Message) {
    message.assigned_provider = None;
    message.properties.remove(ASSIGNED_PROVIDER_PROPERTY);
}

fn advance(timestamp: Timestamp, span: Span) -> AppResult<Timestamp> {
    timestamp
        .checked_add(span)
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })
}
