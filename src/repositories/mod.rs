//! Store contracts consumed by the dispatch pipeline.
//!
//! The core never implements persistence; it talks to these traits. The
//! `memory` module provides RwLock-backed implementations for tests and the
//! demo binary.

mod audit_store;
pub mod memory;
mod message_store;
mod provider_store;

pub use audit_store::AuditStore;
pub use message_store::MessageStore;
pub use provider_store::ProviderStore;

use std::sync::Arc;

/// Aggregates the store contracts for convenient wiring.
///
/// Cloning is cheap; every store is behind an `Arc`.
#[derive(Clone)]
pub struct Stores {
    pub messages: Arc<dyn MessageStore>,
    pub audit: Arc<dyn AuditStore>,
    pub providers: Arc<dyn ProviderStore>,
}

impl Stores {
    /// Creates a Stores aggregate over the in-memory backends.
    pub fn in_memory() -> Self {
        Self {
            messages: Arc::new(memory::InMemoryMessageStore::new()),
            audit: Arc::new(memory::InMemoryAuditStore::new()),
            providers: Arc::new(memory::InMemoryProviderStore::new()),
        }
    }
}
