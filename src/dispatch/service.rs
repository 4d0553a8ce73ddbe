//! Dispatch cycle runner.
//!
//! One cycle: collect due Pending messages, match each to a provider,
//! assign ownership through the state authority, group by assigned
//! provider, and run each provider batch. Batches run concurrently up to a
//! configured limit; a batch-fatal provider error releases that batch's
//! messages back to Pending so the next cycle can reassign them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::models::{Message, Provider};
use crate::repositories::MessageStore;
use crate::services::providers::{
    DispatchOutcome, DispatchProvider, DispatchStatus, ProviderRegistry,
};
use crate::services::{MessageStateService, ProviderMatcher};

/// Tuning knobs for one cycle
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Upper bound on messages collected per cycle
    pub batch_size: usize,
    /// Concurrent provider batches
    pub max_concurrent_batches: usize,
    /// Per-batch deadline; on expiry the batch's cancellation token fires
    /// and the provider abandons the not-yet-attempted remainder
    pub batch_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrent_batches: 4,
            batch_timeout: Duration::from_secs(120),
        }
    }
}

/// What one cycle did
#[derive(Debug, Default)]
pub struct CycleSummary {
    /// Due messages the store returned
    pub collected: usize,
    /// Messages that reached Processing with an owner
    pub assigned: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

/// Runs dispatch cycles over the store, matcher, and provider registry.
pub struct DispatchService {
    messages: Arc<dyn MessageStore>,
    state: Arc<MessageStateService>,
    matcher: ProviderMatcher,
    registry: Arc<ProviderRegistry>,
    options: DispatchOptions,
}

impl DispatchService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        state: Arc<MessageStateService>,
        matcher: ProviderMatcher,
        registry: Arc<ProviderRegistry>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            messages,
            state,
            matcher,
            registry,
            options,
        }
    }

    /// Runs one pipeline cycle.
    ///
    /// Storage failures while assigning one message are logged and skip
    /// only that message; the cycle itself fails only when the initial
    /// collection cannot be read.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> AppResult<CycleSummary> {
        let due = self.messages.find_due_pending(Timestamp::now()).await?;
        let collected = due.len();

        let mut batches: Vec<(Provider, Vec<Message>)> = Vec::new();
        let mut slots: HashMap<i64, usize> = HashMap::new();
        let mut assigned = 0usize;

        for message in due.into_iter().take(self.options.batch_size) {
            if cancel.is_cancelled() {
                break;
            }

            let candidates = self.matcher.candidates_for(&message).await?;
            let Some(provider) = candidates.into_iter().next() else {
                tracing::warn!(
                    message_key = %message.message_key,
                    kind = %message.kind,
                    "no capable provider for message"
                );
                continue;
            };

            match self.state.to_processing_state(message, &provider).await {
                Ok(updated) => {
                    assigned += 1;
                    let provider_id = provider.id;
                    let slot = *slots.entry(provider_id).or_insert_with(|| {
                        batches.push((provider, Vec::new()));
                        batches.len() - 1
                    });
                    batches[slot].1.push(updated);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to assign message; it stays pending");
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_batches));
        let mut join_set: JoinSet<Vec<DispatchOutcome>> = JoinSet::new();
        for (entry, batch) in batches {
            let semaphore = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let state = Arc::clone(&self.state);
            let cancel = cancel.clone();
            let timeout = self.options.batch_timeout;
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Vec::new();
                };
                run_batch(registry, state, entry, batch, cancel, timeout).await
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(batch_outcomes) => outcomes.extend(batch_outcomes),
                Err(e) => tracing::error!(error = %e, "provider batch task panicked"),
            }
        }

        Ok(CycleSummary {
            collected,
            assigned,
            outcomes,
        })
    }
}

async fn run_batch(
    registry: Arc<ProviderRegistry>,
    state: Arc<MessageStateService>,
    entry: Provider,
    batch: Vec<Message>,
    cancel: CancellationToken,
    timeout: Duration,
) -> Vec<DispatchOutcome> {
    let provider = match registry.resolve(&entry.implementation) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(
                provider = %entry.name,
                error = %e,
                "no runtime implementation for provider; releasing batch"
            );
            return release_batch(&state, batch).await;
        }
    };

    // The deadline fires the batch token; the provider observes it between
    // messages, so an in-flight send is never torn down mid-message.
    let batch_cancel = cancel.child_token();
    let deadline = batch_cancel.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        deadline.cancel();
    });

    let result = provider
        .process_messages(batch.clone(), &entry, &batch_cancel)
        .await;
    timer.abort();

    match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            // batch-fatal errors occur before any per-message mutation
            tracing::error!(
                provider = %entry.name,
                error = %e,
                "provider batch failed; releasing messages for reassignment"
            );
            release_batch(&state, batch).await
        }
    }
}

async fn release_batch(
    state: &MessageStateService,
    batch: Vec<Message>,
) -> Vec<DispatchOutcome> {
    let mut outcomes = Vec::with_capacity(batch.len());
    for message in batch {
        let key = message.message_key.clone();
        match state.to_pending_state(message).await {
            Ok(_) => outcomes.push(DispatchOutcome::new(key, DispatchStatus::Skipped)),
            Err(e) => {
                tracing::warn!(message_key = %key, error = %e, "failed to release message");
                outcomes.push(DispatchOutcome::with_detail(
                    key,
                    DispatchStatus::Indeterminate,
                    e.to_string(),
                ));
            }
        }
    }
    outcomes
}
