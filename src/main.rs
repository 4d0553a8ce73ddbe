use std::sync::Arc;

use courier::config::ConfigLoader;
use courier::dispatch::DispatchScheduler;
use courier::logger::init_logger;
use courier::repositories::Stores;
use courier::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ConfigLoader::new()?.load()?;
    let _guard = init_logger(&settings.logger)?;

    tracing::info!(
        name = %settings.application.name,
        version = %settings.application.version,
        "starting notification dispatch gateway"
    );

    // The demo binary runs over the in-memory stores; a deployment
    // substitutes its own store implementations here.
    let stores = Stores::in_memory();
    let app = AppState::new(stores, &settings);

    let scheduler = Arc::new(
        DispatchScheduler::new(
            app.dispatch.clone(),
            settings.dispatch.cron_expression.clone(),
        )
        .await?,
    );
    scheduler.start().await?;
    tracing::info!(cron = %settings.dispatch.cron_expression, "dispatch scheduler started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    scheduler.stop().await?;

    Ok(())
}
