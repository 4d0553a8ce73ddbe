//! SMTP dispatch provider.
//!
//! Resolves its transport configuration from the catalog entry, builds one
//! SMTP client per batch, and walks the batch one message at a time through
//! the shared guard/success/failure paths. The transport client sits behind
//! the `MailTransport` seam; production uses lettre's async SMTP transport.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::{Attachment, MailDetail, Message, MessageKind, Provider};
use crate::services::providers::provider::{DispatchOutcome, DispatchProvider};
use crate::services::providers::support::ProviderSupport;

/// Required catalog parameter: SMTP server address
pub const PARAM_SMTP_SERVER: &str = "smtp-server";
/// Required catalog parameter: credential identity
pub const PARAM_SMTP_USER: &str = "smtp-user";
/// Required catalog parameter: credential secret
pub const PARAM_SMTP_PASSWORD: &str = "smtp-password";

/// Delimiter between addresses in a recipient list
const ADDRESS_DELIMITER: char = ';';

// ============================================================================
// Transport seam
// ============================================================================

/// Resolved SMTP connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub server: String,
    pub username: String,
    pub password: String,
}

/// Transport envelope built from a mail payload
#[derive(Debug, Clone)]
pub struct MailEnvelope {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl MailEnvelope {
    /// Builds the envelope from a mail payload, splitting the `;`-joined
    /// recipient lists and skipping empty segments.
    pub fn build(detail: &MailDetail, attachments: Vec<Attachment>) -> Self {
        Self {
            from: detail.from.clone(),
            to: split_addresses(&detail.to),
            cc: split_addresses(&detail.cc),
            bcc: split_addresses(&detail.bcc),
            subject: detail.subject.clone(),
            body: detail.body.clone(),
            attachments,
        }
    }
}

/// Splits a `;`-joined address list, skipping empty segments.
pub fn split_addresses(joined: &str) -> Vec<String> {
    joined
        .split(ADDRESS_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One synchronous send over an established SMTP client.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, envelope: &MailEnvelope) -> AppResult<()>;
}

/// Builds a transport client from resolved configuration, once per batch.
pub trait MailTransportFactory: Send + Sync {
    fn connect(&self, config: &SmtpConfig) -> AppResult<Arc<dyn MailTransport>>;
}

// ============================================================================
// Lettre-backed transport
// ============================================================================

/// Production transport factory over lettre's async SMTP client
#[derive(Debug, Clone, Copy, Default)]
pub struct LettreTransportFactory;

impl MailTransportFactory for LettreTransportFactory {
    fn connect(&self, config: &SmtpConfig) -> AppResult<Arc<dyn MailTransport>> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| AppError::configuration(PARAM_SMTP_SERVER, e.to_string()))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Arc::new(LettreTransport { transport }))
    }
}

struct LettreTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn send(&self, envelope: &MailEnvelope) -> AppResult<()> {
        let message = build_mail(envelope)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Transport {
                detail: e.to_string(),
            })
    }
}

fn parse_mailbox(address: &str) -> AppResult<Mailbox> {
    address.parse().map_err(|_| AppError::Transport {
        detail: format!("invalid address: {address}"),
    })
}

fn build_mail(envelope: &MailEnvelope) -> AppResult<lettre::Message> {
    let mut builder = lettre::Message::builder()
        .from(parse_mailbox(&envelope.from)?)
        .subject(envelope.subject.clone());
    for address in &envelope.to {
        builder = builder.to(parse_mailbox(address)?);
    }
    for address in &envelope.cc {
        builder = builder.cc(parse_mailbox(address)?);
    }
    for address in &envelope.bcc {
        builder = builder.bcc(parse_mailbox(address)?);
    }

    let message = if envelope.attachments.is_empty() {
        builder.body(envelope.body.clone())
    } else {
        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(envelope.body.clone()));
        for attachment in &envelope.attachments {
            let content_type =
                ContentType::parse(&attachment.mime_type).map_err(|_| AppError::Transport {
                    detail: format!("invalid attachment MIME type: {}", attachment.mime_type),
                })?;
            parts = parts.singlepart(
                MailAttachment::new(attachment.file_name.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(parts)
    };

    message.map_err(|e| AppError::Transport {
        detail: e.to_string(),
    })
}

// ============================================================================
// Provider
// ============================================================================

/// SMTP-style mail provider
pub struct SmtpProvider {
    support: ProviderSupport,
    factory: Arc<dyn MailTransportFactory>,
}

impl SmtpProvider {
    pub fn new(support: ProviderSupport) -> Self {
        Self::with_factory(support, Arc::new(LettreTransportFactory))
    }

    /// Creates the provider with an explicit transport factory (tests
    /// inject deterministic transports here).
    pub fn with_factory(support: ProviderSupport, factory: Arc<dyn MailTransportFactory>) -> Self {
        Self { support, factory }
    }

    /// Resolves the three required parameters from the catalog entry.
    /// Absence of any one aborts the whole batch before any per-message
    /// mutation.
    fn resolve_config(entry: &Provider) -> AppResult<SmtpConfig> {
        Ok(SmtpConfig {
            server: required_parameter(entry, PARAM_SMTP_SERVER)?.to_string(),
            username: required_parameter(entry, PARAM_SMTP_USER)?.to_string(),
            password: required_parameter(entry, PARAM_SMTP_PASSWORD)?.to_string(),
        })
    }

    async fn process_one(
        &self,
        transport: &dyn MailTransport,
        message: Message,
        entry: &Provider,
    ) -> DispatchOutcome {
        if message.kind != MessageKind::Mail {
            return self.support.reject_wrong_kind(message, entry).await;
        }

        let detail = match self.support.mail_detail(message.id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => return self.support.reject_missing_detail(message, entry).await,
            Err(e) => {
                return self
                    .support
                    .indeterminate(message.message_key.clone(), entry, &e);
            }
        };
        let attachments = match self.support.attachments(message.id).await {
            Ok(attachments) => attachments,
            Err(e) => {
                return self
                    .support
                    .indeterminate(message.message_key.clone(), entry, &e);
            }
        };

        let envelope = MailEnvelope::build(&detail, attachments);
        match transport.send(&envelope).await {
            Ok(()) => self.support.complete(message, entry).await,
            Err(e) => {
                let detail = e.failure_detail();
                self.support.fail(message, entry, &detail).await
            }
        }
    }
}

#[async_trait]
impl DispatchProvider for SmtpProvider {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::Mail
    }

    async fn process_messages(
        &self,
        messages: Vec<Message>,
        entry: &Provider,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<DispatchOutcome>> {
        let config = Self::resolve_config(entry)?;
        let transport = self.factory.connect(&config)?;

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            if cancel.is_cancelled() {
                outcomes.push(self.support.release(message, entry).await);
                continue;
            }
            outcomes.push(self.process_one(transport.as_ref(), message, entry).await);
        }
        Ok(outcomes)
    }
}

fn required_parameter<'a>(entry: &'a Provider, name: &str) -> AppResult<&'a str> {
    entry.parameter(name).ok_or_else(|| {
        AppError::configuration(
            name,
            format!("provider '{}' is missing required parameter", entry.name),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::{
        AuditEvent, MessageDetail, MessageState, NewMessage, ProviderParameter, StatusUpdate,
        TextDetail,
    };
    use crate::repositories::{AuditStore, MessageStore, Stores};
    use crate::services::jitter::FixedJitter;
    use crate::services::providers::provider::DispatchStatus;
    use crate::services::providers::support::{
        MISSING_DETAIL_DIAGNOSTIC, WRONG_KIND_DIAGNOSTIC,
    };
    use crate::services::state_service::MessageStateService;
    use crate::services::status_publisher::StatusPublisher;

    /// Fails any envelope addressed to a recipient containing
    /// "unavailable"; counts sends either way.
    struct FakeTransport {
        sends: AtomicUsize,
    }

    impl FakeTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sends: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MailTransport for FakeTransport {
        async fn send(&self, envelope: &MailEnvelope) -> AppResult<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if envelope.to.iter().any(|a| a.contains("unavailable")) {
                return Err(AppError::Transport {
                    detail: "mailbox unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    struct FakeFactory {
        transport: Arc<FakeTransport>,
        connects: AtomicUsize,
    }

    impl FakeFactory {
        fn new(transport: Arc<FakeTransport>) -> Arc<Self> {
            Arc::new(Self {
                transport,
                connects: AtomicUsize::new(0),
            })
        }
    }

    impl MailTransportFactory for FakeFactory {
        fn connect(&self, _config: &SmtpConfig) -> AppResult<Arc<dyn MailTransport>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(self.transport.clone())
        }
    }

    struct Harness {
        stores: Stores,
        state: Arc<MessageStateService>,
        publisher: StatusPublisher,
        provider: SmtpProvider,
        transport: Arc<FakeTransport>,
        factory: Arc<FakeFactory>,
        entry: Provider,
    }

    fn catalog_entry(parameters: Vec<ProviderParameter>) -> Provider {
        Provider {
            id: 7,
            name: "primary-smtp".to_string(),
            can_process_mail: true,
            can_process_text: false,
            priority: 1,
            is_disabled: false,
            implementation: "smtp".to_string(),
            parameters,
        }
    }

    fn full_parameters() -> Vec<ProviderParameter> {
        vec![
            ProviderParameter {
                name: PARAM_SMTP_SERVER.to_string(),
                value: "mail.example.com".to_string(),
            },
            ProviderParameter {
                name: PARAM_SMTP_USER.to_string(),
                value: "mailer".to_string(),
            },
            ProviderParameter {
                name: PARAM_SMTP_PASSWORD.to_string(),
                value: "secret".to_string(),
            },
        ]
    }

    fn harness(parameters: Vec<ProviderParameter>) -> Harness {
        let stores = Stores::in_memory();
        let publisher = StatusPublisher::new(16);
        let state = Arc::new(MessageStateService::with_jitter(
            stores.messages.clone(),
            stores.audit.clone(),
            publisher.clone(),
            Arc::new(FixedJitter(30)),
        ));
        let support = ProviderSupport::new(state.clone(), stores.messages.clone());
        let transport = FakeTransport::new();
        let factory = FakeFactory::new(transport.clone());
        let provider = SmtpProvider::with_factory(support, factory.clone());
        Harness {
            stores,
            state,
            publisher,
            provider,
            transport,
            factory,
            entry: catalog_entry(parameters),
        }
    }

    impl Harness {
        /// Stores a mail message and walks it to Processing the way the
        /// pipeline does before a provider batch runs.
        async fn assigned_mail(&self, to: &str) -> Message {
            let message = self
                .state
                .store_message(
                    NewMessage::new(MessageKind::Mail),
                    MessageDetail::Mail(MailDetail {
                        message_id: 0,
                        from: "sender@example.com".to_string(),
                        to: to.to_string(),
                        cc: String::new(),
                        bcc: String::new(),
                        subject: "subject".to_string(),
                        body: "body".to_string(),
                    }),
                    vec![],
                )
                .await
                .unwrap();
            self.state
                .to_processing_state(message, &self.entry)
                .await
                .unwrap()
        }

        async fn assigned_text(&self) -> Message {
            let message = self
                .state
                .store_message(
                    NewMessage::new(MessageKind::Text),
                    MessageDetail::Text(TextDetail {
                        message_id: 0,
                        phone_number: "+15550100".to_string(),
                        body: "hi".to_string(),
                    }),
                    vec![],
                )
                .await
                .unwrap();
            self.state
                .to_processing_state(message, &self.entry)
                .await
                .unwrap()
        }

        async fn reload(&self, id: i64) -> Message {
            self.stores.messages.find_by_id(id).await.unwrap().unwrap()
        }
    }

    #[test]
    fn test_split_addresses_skips_empty_segments() {
        assert_eq!(
            split_addresses("a@example.com;;b@example.com;"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(split_addresses("").is_empty());
        assert!(split_addresses(";;").is_empty());
    }

    #[tokio::test]
    async fn test_wrong_kind_returns_message_to_pending() {
        let harness = harness(full_parameters());
        let message = harness.assigned_text().await;
        let audits_before = harness
            .stores
            .audit
            .find_by_message(message.id)
            .await
            .unwrap()
            .len();

        let outcomes = harness
            .provider
            .process_messages(vec![message.clone()], &harness.entry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, DispatchStatus::Returned);

        let reloaded = harness.reload(message.id).await;
        assert_eq!(reloaded.state, MessageState::Pending);
        assert!(reloaded.assigned_provider.is_none());
        assert_eq!(reloaded.error_count, 1);

        let entries = harness
            .stores
            .audit
            .find_by_message(message.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), audits_before + 1);
        let rejection = entries.last().unwrap();
        assert_eq!(rejection.event, AuditEvent::Error);
        assert_eq!(rejection.detail.as_deref(), Some(WRONG_KIND_DIAGNOSTIC));
        assert_eq!(harness.transport.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_detail_returns_message_to_pending() {
        let harness = harness(full_parameters());
        // bypass store_message so no mail detail exists
        let message = harness
            .stores
            .messages
            .create(NewMessage::new(MessageKind::Mail))
            .await
            .unwrap();
        let message = harness
            .state
            .to_processing_state(message, &harness.entry)
            .await
            .unwrap();

        let outcomes = harness
            .provider
            .process_messages(vec![message.clone()], &harness.entry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes[0].status, DispatchStatus::Returned);
        assert_eq!(
            outcomes[0].detail.as_deref(),
            Some(MISSING_DETAIL_DIAGNOSTIC)
        );
        let reloaded = harness.reload(message.id).await;
        assert_eq!(reloaded.state, MessageState::Pending);
        assert_eq!(reloaded.error_count, 1);
    }

    #[tokio::test]
    async fn test_successful_send_reaches_sent() {
        let harness = harness(full_parameters());
        let mut rx = harness.publisher.subscribe();
        let message = harness.assigned_mail("rcpt@example.com").await;

        let outcomes = harness
            .provider
            .process_messages(vec![message.clone()], &harness.entry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes[0].status, DispatchStatus::Sent);
        let reloaded = harness.reload(message.id).await;
        assert_eq!(reloaded.state, MessageState::Sent);

        let entries = harness
            .stores
            .audit
            .find_by_message(message.id)
            .await
            .unwrap();
        let sent = entries.last().unwrap();
        assert_eq!(sent.event, AuditEvent::Sent);
        assert_eq!(sent.before_state, Some(MessageState::Processing));
        assert_eq!(sent.after_state, Some(MessageState::Sent));

        let status = rx.recv().await.unwrap();
        assert_eq!(status, StatusUpdate::success(&message.message_key));
    }

    #[tokio::test]
    async fn test_transport_failure_reaches_failed_with_backoff() {
        let harness = harness(full_parameters());
        let mut rx = harness.publisher.subscribe();
        let message = harness.assigned_mail("unavailable@example.com").await;

        let before = jiff::Timestamp::now();
        let outcomes = harness
            .provider
            .process_messages(vec![message.clone()], &harness.entry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes[0].status, DispatchStatus::Failed);
        assert_eq!(outcomes[0].detail.as_deref(), Some("mailbox unavailable"));

        let reloaded = harness.reload(message.id).await;
        assert_eq!(reloaded.state, MessageState::Failed);
        assert_eq!(reloaded.error_count, 1);
        let delta = reloaded.process_after.unwrap().as_second() - before.as_second();
        assert!((1..=60).contains(&delta), "delta {delta} outside [1,60]");

        let entries = harness
            .stores
            .audit
            .find_by_message(message.id)
            .await
            .unwrap();
        let failed = entries.last().unwrap();
        assert_eq!(failed.event, AuditEvent::Error);
        assert_eq!(failed.detail.as_deref(), Some("mailbox unavailable"));

        let status = rx.recv().await.unwrap();
        assert_eq!(
            status,
            StatusUpdate::failure(&message.message_key, "mailbox unavailable")
        );
    }

    #[tokio::test]
    async fn test_batch_isolation() {
        let harness = harness(full_parameters());
        let first = harness.assigned_mail("a@example.com").await;
        let second = harness.assigned_mail("unavailable@example.com").await;
        let third = harness.assigned_mail("c@example.com").await;

        let outcomes = harness
            .provider
            .process_messages(
                vec![first.clone(), second.clone(), third.clone()],
                &harness.entry,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let statuses: Vec<DispatchStatus> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                DispatchStatus::Sent,
                DispatchStatus::Failed,
                DispatchStatus::Sent
            ]
        );
        assert_eq!(harness.reload(first.id).await.state, MessageState::Sent);
        assert_eq!(harness.reload(second.id).await.state, MessageState::Failed);
        assert_eq!(harness.reload(third.id).await.state, MessageState::Sent);
    }

    #[tokio::test]
    async fn test_missing_parameter_aborts_batch_without_mutation() {
        let parameters = vec![
            ProviderParameter {
                name: PARAM_SMTP_SERVER.to_string(),
                value: "mail.example.com".to_string(),
            },
            ProviderParameter {
                name: PARAM_SMTP_USER.to_string(),
                value: "mailer".to_string(),
            },
        ];
        let harness = harness(parameters);
        let first = harness.assigned_mail("a@example.com").await;
        let second = harness.assigned_mail("b@example.com").await;
        let audits_before = harness
            .stores
            .audit
            .find_by_message(first.id)
            .await
            .unwrap()
            .len();

        let err = harness
            .provider
            .process_messages(
                vec![first.clone(), second.clone()],
                &harness.entry,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Configuration { ref key, .. } if key == PARAM_SMTP_PASSWORD));
        assert_eq!(harness.factory.connects.load(Ordering::SeqCst), 0);

        for message in [&first, &second] {
            let reloaded = harness.reload(message.id).await;
            assert_eq!(reloaded.state, MessageState::Processing);
            assert_eq!(reloaded.assigned_provider, Some(harness.entry.id));
            assert_eq!(reloaded.error_count, 0);
        }
        let audits_after = harness
            .stores
            .audit
            .find_by_message(first.id)
            .await
            .unwrap()
            .len();
        assert_eq!(audits_before, audits_after);
    }

    #[tokio::test]
    async fn test_cancelled_batch_releases_remainder() {
        let harness = harness(full_parameters());
        let first = harness.assigned_mail("a@example.com").await;
        let second = harness.assigned_mail("b@example.com").await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = harness
            .provider
            .process_messages(vec![first.clone(), second.clone()], &harness.entry, &cancel)
            .await
            .unwrap();

        assert!(outcomes.iter().all(|o| o.status == DispatchStatus::Skipped));
        assert_eq!(harness.transport.sends.load(Ordering::SeqCst), 0);
        for message in [&first, &second] {
            let reloaded = harness.reload(message.id).await;
            assert_eq!(reloaded.state, MessageState::Pending);
            assert!(reloaded.assigned_provider.is_none());
            assert_eq!(reloaded.error_count, 0);
        }
    }

    #[tokio::test]
    async fn test_attachments_travel_with_the_envelope() {
        let harness = harness(full_parameters());
        let message = harness
            .state
            .store_message(
                NewMessage::new(MessageKind::Mail),
                MessageDetail::Mail(MailDetail {
                    message_id: 0,
                    from: "sender@example.com".to_string(),
                    to: "rcpt@example.com".to_string(),
                    cc: "copy@example.com;".to_string(),
                    bcc: String::new(),
                    subject: "report".to_string(),
                    body: "attached".to_string(),
                }),
                vec![crate::models::NewAttachment {
                    message_id: 0,
                    file_name: "report.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    content: vec![0x25, 0x50, 0x44, 0x46],
                }],
            )
            .await
            .unwrap();

        let detail = harness
            .stores
            .messages
            .find_mail_detail(message.id)
            .await
            .unwrap()
            .unwrap();
        let attachments = harness
            .stores
            .messages
            .find_attachments(message.id)
            .await
            .unwrap();
        let envelope = MailEnvelope::build(&detail, attachments);

        assert_eq!(envelope.to, vec!["rcpt@example.com".to_string()]);
        assert_eq!(envelope.cc, vec!["copy@example.com".to_string()]);
        assert!(envelope.bcc.is_empty());
        assert_eq!(envelope.attachments.len(), 1);
        assert_eq!(envelope.attachments[0].mime_type, "application/pdf");
    }
}
