//! Cron-driven execution of dispatch cycles.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};
use tokio_util::sync::CancellationToken;

use crate::dispatch::service::DispatchService;
use crate::error::{AppError, AppResult};

/// Wraps tokio-cron-scheduler to run the dispatch cycle on a schedule.
pub struct DispatchScheduler {
    scheduler: Arc<Mutex<TokioCronScheduler>>,
    service: Arc<DispatchService>,
    cancel: CancellationToken,
    cron_expression: String,
}

impl DispatchScheduler {
    pub async fn new(service: Arc<DispatchService>, cron_expression: String) -> AppResult<Self> {
        let scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            service,
            cancel: CancellationToken::new(),
            cron_expression,
        })
    }

    /// Token cancelled on shutdown; cycles and provider batches observe it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Registers the cycle job and starts the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        let service = Arc::clone(&self.service);
        let cancel = self.cancel.clone();

        let cron_job = Job::new_async(self.cron_expression.as_str(), move |_uuid, _lock| {
            let service = Arc::clone(&service);
            let cancel = cancel.clone();

            Box::pin(async move {
                if cancel.is_cancelled() {
                    return;
                }
                match service.run_cycle(&cancel).await {
                    Ok(summary) => tracing::info!(
                        collected = summary.collected,
                        assigned = summary.assigned,
                        outcomes = summary.outcomes.len(),
                        "dispatch cycle finished"
                    ),
                    Err(e) => tracing::error!(error = %e, "dispatch cycle failed"),
                }
            })
        })
        .map_err(|e| AppError::BadRequest {
            message: format!("Invalid cron expression: {}", e),
        })?;

        self.scheduler
            .lock()
            .await
            .add(cron_job)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }

    /// Stops the scheduler gracefully; running cycles observe the
    /// cancellation token and abandon their not-yet-attempted work.
    pub async fn stop(&self) -> AppResult<()> {
        self.cancel.cancel();
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }
}
