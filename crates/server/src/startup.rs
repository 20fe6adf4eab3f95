use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::env::ensure_env;
use configs::{AppConfig, ServerConfig, StorageConfig};
use service::{Collections, StorageClient};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub collections: Collections,
}

impl AppState {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", server.host, server.port).parse()?)
}

/// Wire the storage client from configuration and run the initial load of
/// every collection. All three bins must be configured.
pub async fn build_state(cfg: &StorageConfig) -> Result<AppState, StartupError> {
    let storage = StorageClient::from_config(cfg).await?;
    storage.bins().require_all()?;
    let collections = Collections::new(Arc::new(storage));
    collections.load_all().await;
    if !collections.reconcile_product_counts().await {
        warn!("initial category product counts were not stored remotely");
    }
    Ok(AppState::new(collections))
}

/// Public entry: build the app and run the HTTP server.
/// Expects `.env` and the tracing subscriber to be set up by the caller.
pub async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    info!(storage = ?cfg.storage, "configuration loaded");

    ensure_env(&cfg.storage.cache_path).await?;
    let state = build_state(&cfg.storage).await?;

    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, "starting admin server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
