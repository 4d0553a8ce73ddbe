mod audit;
mod message;
mod provider;
mod status;

pub use audit::{AuditEntry, AuditEvent, NewAuditEntry};
pub use message::{
    ASSIGNED_PROVIDER_PROPERTY, Attachment, MailDetail, Message, MessageDetail, MessageKind,
    MessageState, NewAttachment, NewMessage, TextDetail,
};
pub use provider::{NewProvider, Provider, ProviderParameter};
pub use status::StatusUpdate;
