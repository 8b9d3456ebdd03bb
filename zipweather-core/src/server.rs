use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::{
    Config,
    api::{self, HopContext},
    orchestrator::Orchestrator,
    provider,
};

/// Serves `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, router.layer(TraceLayer::new_for_http()))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server terminated with an error")?;

    tracing::info!(%addr, "server stopped");
    Ok(())
}

/// Spawns a task that cancels `token` on Ctrl+C or SIGTERM.
pub fn shutdown_signal(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
            _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }

        token.cancel();
    });
}

fn hop_context(config: &Config, shutdown: &CancellationToken) -> HopContext {
    HopContext::new(shutdown.clone(), config.outbound.timeout())
}

/// Router for the locality hop, resolving against the geocoding provider.
pub fn locality_hop(config: &Config, http: &Client, shutdown: &CancellationToken) -> Router {
    let resolver = provider::geocoding_resolver_from_config(config, http);
    api::locality_router(resolver, hop_context(config, shutdown))
}

/// Router for the weather hop, resolving localities via the configured backend.
pub fn weather_hop(config: &Config, http: &Client, shutdown: &CancellationToken) -> Result<Router> {
    let orchestrator = Orchestrator::new(
        provider::locality_resolver_from_config(config, http)?,
        provider::weather_resolver_from_config(config, http)?,
    );
    Ok(api::weather_router(orchestrator, hop_context(config, shutdown)))
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))
}
