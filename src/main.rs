use std::sync::Arc;

use anyhow::Context;

mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod household;
mod models;
mod routes;
mod services;

use config::Config;
use db::DynStore;
use services::tips::TipCatalog;

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Arc<Config>,
    pub tip_catalog: Arc<TipCatalog>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sleeplog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env().context("Invalid configuration")?);

    let tip_catalog = match &config.tip_catalog_path {
        Some(path) => TipCatalog::from_json_file(path)?,
        None => TipCatalog::default(),
    };
    tracing::info!(
        entries = tip_catalog.len(),
        custom = config.tip_catalog_path.is_some(),
        "Tip catalog loaded"
    );

    let store = db::connect(&config)
        .await
        .context("Failed to open sleep log store")?;

    let state = AppState {
        store,
        config: config.clone(),
        tip_catalog: Arc::new(tip_catalog),
    };

    let app = routes::build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
