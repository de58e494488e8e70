//! Daemon lifecycle: config, store, sweeper, metrics listener, API server

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ethereal_core::config::EtherealConfig;
use ethereal_store::{KvStore, MemoryStore};
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::metrics::{ApiMetrics, HealthState};
use crate::state::AppState;

/// Read and validate the config file. A missing file yields the defaults.
///
/// Runs before logging is installed, so it reports nothing itself.
pub async fn load_config(path: &Path) -> Result<EtherealConfig> {
    let config = if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        EtherealConfig::from_toml(&content)
            .with_context(|| format!("parsing config {}", path.display()))?
    } else {
        EtherealConfig::default()
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub async fn run(config: EtherealConfig) -> Result<()> {
    info!("daemon starting");

    // ── Store ────────────────────────────────────────────────────────────
    let memory = Arc::new(MemoryStore::new());
    let sweeper = memory
        .clone()
        .spawn_sweeper(Duration::from_secs(config.store.sweep_interval_secs));
    let store: Arc<dyn KvStore> = memory;

    // ── Metrics ──────────────────────────────────────────────────────────
    let mut registry = Registry::default();
    let metrics = ApiMetrics::new(&mut registry);
    let registry = Arc::new(registry);

    if let Some(addr) = config.server.metrics_addr.clone() {
        let state = HealthState {
            registry: registry.clone(),
            store: store.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = crate::metrics::serve(addr, state).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    // ── API ──────────────────────────────────────────────────────────────
    let state = AppState::new(&config, store, metrics).context("building API state")?;
    let app = crate::api::router(state);

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;

    info!(
        listen = %config.server.listen,
        remote_enabled = config.remote.enabled,
        session_ttl_secs = config.local.ttl_secs,
        "API: listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server")?;

    sweeper.abort();
    info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("installing Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("registering SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
