//! Application state wiring.
//!
//! Builds the pipeline services over a set of store contracts. Cloning is
//! cheap; everything is behind an `Arc`.

use std::sync::Arc;

use crate::config::Settings;
use crate::dispatch::DispatchService;
use crate::repositories::Stores;
use crate::services::providers::{ProviderRegistry, ProviderSupport, SmtpProvider};
use crate::services::{MessageStateService, ProviderMatcher, StatusPublisher, UniformJitter};

/// Application state containing the wired pipeline.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub publisher: StatusPublisher,
    pub state_service: Arc<MessageStateService>,
    pub matcher: ProviderMatcher,
    pub registry: Arc<ProviderRegistry>,
    pub dispatch: Arc<DispatchService>,
}

impl AppState {
    /// Wires the pipeline over the given stores, registering the SMTP
    /// provider under its implementation selector.
    pub fn new(stores: Stores, settings: &Settings) -> Self {
        let publisher = StatusPublisher::new(settings.dispatch.status_capacity);
        let jitter = Arc::new(UniformJitter::new(
            settings.dispatch.backoff_min_seconds,
            settings.dispatch.backoff_max_seconds,
        ));
        let state_service = Arc::new(MessageStateService::with_jitter(
            stores.messages.clone(),
            stores.audit.clone(),
            publisher.clone(),
            jitter,
        ));

        let support = ProviderSupport::new(state_service.clone(), stores.messages.clone());
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(SmtpProvider::new(support)));
        let registry = Arc::new(registry);

        let matcher = ProviderMatcher::new(stores.providers.clone());
        let dispatch = Arc::new(DispatchService::new(
            stores.messages.clone(),
            state_service.clone(),
            matcher.clone(),
            registry.clone(),
            settings.dispatch.options(),
        ));

        Self {
            stores,
            publisher,
            state_service,
            matcher,
            registry,
            dispatch,
        }
    }
}
