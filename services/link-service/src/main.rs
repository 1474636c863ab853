//! Epic account link bridge
//!
//! Single-binary service that:
//! 1. Starts a PKCE login flow per external id (`/login/{external_id}`)
//! 2. Completes the provider callback and persists the token triple
//! 3. Refreshes stored tokens on demand (`/refresh/{external_id}`)
//! 4. Serves a heuristic cosmetics-ownership projection
//!    (`/cosmetics/{external_id}`)

mod config;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epic_auth::TokenStore;

use crate::config::Config;
use crate::routes::{AppState, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting epic-link-service");

    // Install the Prometheus recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let config = Config::from_env().context("failed to load configuration from environment")?;
    info!(
        redirect_uri = %config.redirect_uri,
        store_path = %config.store_path.display(),
        port = config.port,
        has_client_secret = config.client_secret.is_some(),
        "configuration loaded"
    );

    let store = TokenStore::load(config.store_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open token store at {}",
                config.store_path.display()
            )
        })?;
    let linked_accounts = store.len().await;
    info!(linked_accounts, "token store ready");

    let port = config.port;
    let state = AppState::new(config, store, prometheus_handle);
    let app = build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind to port {port}"))?;

    info!(port, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
