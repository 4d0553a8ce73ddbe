//! Dispatch providers: the runtime contract, the shared behavior every
//! concrete transport composes, and the SMTP implementation.

mod provider;
mod registry;
mod smtp_provider;
mod support;

pub use provider::{DispatchOutcome, DispatchProvider, DispatchStatus};
pub use registry::ProviderRegistry;
pub use smtp_provider::{
    LettreTransportFactory, MailEnvelope, MailTransport, MailTransportFactory, PARAM_SMTP_PASSWORD,
    PARAM_SMTP_SERVER, PARAM_SMTP_USER, SmtpConfig, SmtpProvider, split_addresses,
};
pub use support::{MISSING_DETAIL_DIAGNOSTIC, ProviderSupport, WRONG_KIND_DIAGNOSTIC};
