//! Registry mapping implementation selectors to provider instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::services::providers::provider::DispatchProvider;

/// Maps a catalog entry's implementation selector to the runtime contract
/// implementation that handles its batches.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn DispatchProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own selector
    pub fn register(&mut self, provider: Arc<dyn DispatchProvider>) -> &mut Self {
        self.providers.insert(provider.name(), provider);
        self
    }

    /// Resolves the provider for a catalog entry's selector
    pub fn resolve(&self, implementation: &str) -> AppResult<Arc<dyn DispatchProvider>> {
        self.providers
            .get(implementation)
            .cloned()
            .ok_or_else(|| AppError::NotFound {
                entity: "dispatch_provider".to_string(),
                field: "implementation".to_string(),
                value: implementation.to_string(),
            })
    }
}
