//! In-memory store implementations.
//!
//! RwLock-backed backends for the three store contracts. They serve the
//! test suite and the demo binary; a production deployment supplies its own
//! implementations over a real database. The write lock serializes
//! concurrent updates to the same message, which is the serialization
//! contract the pipeline requires of any storage collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Attachment, AuditEntry, MailDetail, Message, MessageDetail, MessageKind, MessageState,
    NewAttachment, NewAuditEntry, NewMessage, NewProvider, Provider, TextDetail,
};
use crate::repositories::{AuditStore, MessageStore, ProviderStore};

// ============================================================================
// Messages
// ============================================================================

#[derive(Default)]
struct MessageTables {
    next_message_id: i64,
    next_attachment_id: i64,
    messages: HashMap<i64, Message>,
    mail_details: HashMap<i64, MailDetail>,
    text_details: HashMap<i64, TextDetail>,
    attachments: HashMap<i64, Vec<Attachment>>,
}

/// In-memory message store
#[derive(Default)]
pub struct InMemoryMessageStore {
    tables: RwLock<MessageTables>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, new_message: NewMessage) -> AppResult<Message> {
        let mut tables = self.tables.write().await;

        let key = new_message
            .message_key
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if tables.messages.values().any(|m| m.message_key == key) {
            return Err(AppError::Duplicate {
                entity: "message".to_string(),
                field: "message_key".to_string(),
                value: key,
            });
        }

        tables.next_message_id += 1;
        let message = Message {
            id: tables.next_message_id,
            message_key: key,
            kind: new_message.kind,
            state: MessageState::Pending,
            is_disabled: false,
            priority: new_message.priority,
            error_count: 0,
            assigned_provider: None,
            process_after: new_message.process_after,
            archive_after: new_message.archive_after,
            properties: new_message.properties,
            created_at: Timestamp::now(),
        };
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, message_id: i64) -> AppResult<Option<Message>> {
        let tables = self.tables.read().await;
        Ok(tables.messages.get(&message_id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> AppResult<Option<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .values()
            .find(|m| m.message_key == key)
            .cloned())
    }

    async fn update(&self, message: &Message) -> AppResult<Message> {
        let mut tables = self.tables.write().await;
        if !tables.messages.contains_key(&message.id) {
            return Err(AppError::NotFound {
                entity: "message".to_string(),
                field: "id".to_string(),
                value: message.id.to_string(),
            });
        }
        tables.messages.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn delete(&self, message_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        tables.mail_details.remove(&message_id);
        tables.text_details.remove(&message_id);
        tables.attachments.remove(&message_id);
        Ok(tables.messages.remove(&message_id).is_some())
    }

    async fn find_due_pending(&self, now: Timestamp) -> AppResult<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut due: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| {
                m.state == MessageState::Pending
                    && !m.is_disabled
                    && m.process_after.is_none_or(|after| after <= now)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn create_detail(&self, detail: MessageDetail) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match detail {
            MessageDetail::Mail(mail) => {
                tables.mail_details.insert(mail.message_id, mail);
            }
            MessageDetail::Text(text) => {
                tables.text_details.insert(text.message_id, text);
            }
        }
        Ok(())
    }

    async fn find_mail_detail(&self, message_id: i64) -> AppResult<Option<MailDetail>> {
        let tables = self.tables.read().await;
        Ok(tables.mail_details.get(&message_id).cloned())
    }

    async fn find_text_detail(&self, message_id: i64) -> AppResult<Option<TextDetail>> {
        let tables = self.tables.read().await;
        Ok(tables.text_details.get(&message_id).cloned())
    }

    async fn create_attachment(&self, new_attachment: NewAttachment) -> AppResult<Attachment> {
        let mut tables = self.tables.write().await;
        tables.next_attachment_id += 1;
        let attachment = Attachment {
            id: tables.next_attachment_id,
            message_id: new_attachment.message_id,
            file_name: new_attachment.file_name,
            mime_type: new_attachment.mime_type,
            content: new_attachment.content,
        };
        tables
            .attachments
            .entry(attachment.message_id)
            .or_default()
            .push(attachment.clone());
        Ok(attachment)
    }

    async fn find_attachments(&self, message_id: i64) -> AppResult<Vec<Attachment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attachments
            .get(&message_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Audit log
// ============================================================================

#[derive(Default)]
struct AuditTable {
    next_id: i64,
    entries: Vec<AuditEntry>,
}

/// In-memory append-only audit store
#[derive(Default)]
pub struct InMemoryAuditStore {
    table: RwLock<AuditTable>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn create(&self, new_entry: NewAuditEntry) -> AppResult<AuditEntry> {
        let mut table = self.table.write().await;
        table.next_id += 1;
        let entry = AuditEntry {
            id: table.next_id,
            message_id: new_entry.message_id,
            provider_id: new_entry.provider_id,
            event: new_entry.event,
            before_state: new_entry.before_state,
            after_state: new_entry.after_state,
            detail: new_entry.detail,
            created_at: Timestamp::now(),
        };
        table.entries.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_message(&self, message_id: i64) -> AppResult<Vec<AuditEntry>> {
        let table = self.table.read().await;
        // entries are appended in creation order
        Ok(table
            .entries
            .iter()
            .filter(|e| e.message_id == message_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Provider catalog
// ============================================================================

#[derive(Default)]
struct ProviderTable {
    next_id: i64,
    providers: HashMap<i64, Provider>,
}

/// In-memory provider catalog store
#[derive(Default)]
pub struct InMemoryProviderStore {
    table: RwLock<ProviderTable>,
}

impl InMemoryProviderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderStore for InMemoryProviderStore {
    async fn create(&self, new_provider: NewProvider) -> AppResult<Provider> {
        let mut table = self.table.write().await;
        if table
            .providers
            .values()
            .any(|p| p.name == new_provider.name)
        {
            return Err(AppError::Duplicate {
                entity: "provider".to_string(),
                field: "name".to_string(),
                value: new_provider.name,
            });
        }
        table.next_id += 1;
        let provider = Provider {
            id: table.next_id,
            name: new_provider.name,
            can_process_mail: new_provider.can_process_mail,
            can_process_text: new_provider.can_process_text,
            priority: new_provider.priority,
            is_disabled: new_provider.is_disabled,
            implementation: new_provider.implementation,
            parameters: new_provider.parameters,
        };
        table.providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    async fn find_all(&self) -> AppResult<Vec<Provider>> {
        let table = self.table.read().await;
        let mut all: Vec<Provider> = table.providers.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn find_by_capability(&self, kind: MessageKind) -> AppResult<Vec<Provider>> {
        let table = self.table.read().await;
        let mut capable: Vec<Provider> = table
            .providers
            .values()
            .filter(|p| p.can_process(kind))
            .cloned()
            .collect();
        capable.sort_by_key(|p| p.id);
        Ok(capable)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Provider>> {
        let table = self.table.read().await;
        Ok(table.providers.values().find(|p| p.name == name).cloned())
    }
}
