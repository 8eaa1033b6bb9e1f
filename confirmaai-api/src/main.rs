//! # ConfirmaAí API Server
//!
//! Serves the clinic-facing REST API and the WhatsApp webhook. Migrations
//! are applied on startup.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p confirmaai-api
//! ```

use confirmaai_api::{
    app::{build_router, AppState},
    config::Config,
    telemetry,
};
use confirmaai_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("confirmaai_api=debug,tower_http=debug");

    tracing::info!(
        "ConfirmaAí API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    if config.webhook.api_key.is_none() {
        tracing::warn!("EVOLUTION_API_KEY is not set; WhatsApp webhook calls will be rejected");
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
