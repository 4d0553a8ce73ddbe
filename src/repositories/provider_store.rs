//! Provider catalog store contract.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{MessageKind, NewProvider, Provider};

/// Store contract for the provider catalog.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Creates a catalog entry; names are unique
    async fn create(&self, new_provider: NewProvider) -> AppResult<Provider>;

    async fn find_all(&self) -> AppResult<Vec<Provider>>;

    /// Entries whose capability flag matches the given kind
    async fn find_by_capability(&self, kind: MessageKind) -> AppResult<Vec<Provider>>;

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Provider>>;
}
