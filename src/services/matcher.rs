//! Provider matcher.
//!
//! Read-only candidate selection for a pending message. Assignment itself
//! is performed by whoever accepts the match, through the state authority.

use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Message, Provider};
use crate::repositories::ProviderStore;

/// Selects an ordered candidate list of providers for a message.
#[derive(Clone)]
pub struct ProviderMatcher {
    providers: Arc<dyn ProviderStore>,
}

impl ProviderMatcher {
    pub fn new(providers: Arc<dyn ProviderStore>) -> Self {
        Self { providers }
    }

    /// Enabled providers capable of the message's kind, ordered by
    /// ascending priority then name. The name tie-break keeps selection
    /// deterministic for a given catalog state.
    pub async fn candidates_for(&self, message: &Message) -> AppResult<Vec<Provider>> {
        let mut candidates = self.providers.find_by_capability(message.kind).await?;
        candidates.retain(|p| !p.is_disabled);
        candidates.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, NewMessage, NewProvider};
    use crate::repositories::memory::{InMemoryMessageStore, InMemoryProviderStore};
    use crate::repositories::{MessageStore, ProviderStore};

    fn catalog_entry(name: &str, priority: i32, disabled: bool) -> NewProvider {
        NewProvider {
            name: name.to_string(),
            can_process_mail: true,
            can_process_text: false,
            priority,
            is_disabled: disabled,
            implementation: "smtp".to_string(),
            parameters: vec![],
        }
    }

    #[tokio::test]
    async fn test_ordering_and_filters() {
        let providers = Arc::new(InMemoryProviderStore::new());
        providers.create(catalog_entry("zeta", 1, false)).await.unwrap();
        providers.create(catalog_entry("alpha", 1, false)).await.unwrap();
        providers.create(catalog_entry("early", 0, true)).await.unwrap();
        providers.create(catalog_entry("later", 5, false)).await.unwrap();
        providers
            .create(NewProvider {
                name: "sms-only".to_string(),
                can_process_mail: false,
                can_process_text: true,
                priority: 0,
                is_disabled: false,
                implementation: "sms".to_string(),
                parameters: vec![],
            })
            .await
            .unwrap();

        let messages = InMemoryMessageStore::new();
        let message = messages.create(NewMessage::new(MessageKind::Mail)).await.unwrap();

        let matcher = ProviderMatcher::new(providers);
        let candidates = matcher.candidates_for(&message).await.unwrap();
        let names: Vec<&str> = candidates.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta", "later"]);
    }

    #[tokio::test]
    async fn test_matching_is_idempotent() {
        let providers = Arc::new(InMemoryProviderStore::new());
        for (name, priority) in [("b", 2), ("a", 2), ("c", 1)] {
            providers.create(catalog_entry(name, priority, false)).await.unwrap();
        }

        let messages = InMemoryMessageStore::new();
        let message = messages.create(NewMessage::new(MessageKind::Mail)).await.unwrap();

        let matcher = ProviderMatcher::new(providers);
        let first = matcher.candidates_for(&message).await.unwrap();
        let second = matcher.candidates_for(&message).await.unwrap();
        let order = |c: &[Provider]| c.iter().map(|p| p.name.clone()).collect::<Vec<_>>();
        assert_eq!(order(&first), order(&second));
        assert_eq!(order(&first), vec!["c", "a", "b"]);
    }
}
