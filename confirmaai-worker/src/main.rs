//! # ConfirmaAí Worker
//!
//! Sends WhatsApp confirmation and reminder messages for upcoming
//! appointments and marks missed ones as no-shows, every half hour by
//! default.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p confirmaai-worker
//! WHATSAPP_GATEWAY=mock cargo run -p confirmaai-worker
//! ```

use confirmaai_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use confirmaai_worker::{
    config::WorkerConfig,
    gateway::build_gateway,
    runner::SchedulerRunner,
    scheduler::Scheduler,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confirmaai_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "ConfirmaAí Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;
    let clinic = config.clinic_time()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let gateway = build_gateway(&config.gateway)?;
    let scheduler = Scheduler::new(pool.clone(), gateway, clinic);
    let runner = SchedulerRunner::new(Arc::new(scheduler), config.scheduler.clone());
    let shutdown = runner.shutdown_token();

    let handle = tokio::spawn(async move { runner.run().await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, finishing current run..."),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal; stopping"),
    }
    shutdown.cancel();

    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Scheduler task panicked");
    }

    close_pool(pool).await;
    tracing::info!("Worker stopped");

    Ok(())
}
