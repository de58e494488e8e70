//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  Prometheus text format
//!   GET /healthz  liveness probe (always 200 if the process is running)
//!   GET /readyz   readiness probe (200 if the store answers)

use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use ethereal_core::EtherealError;
use ethereal_store::KvStore;
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

type Labels = Vec<(String, String)>;

/// Counters recorded by the API handlers.
#[derive(Clone, Default)]
pub struct ApiMetrics {
    pub remote_created: Counter,
    pub remote_retrieved: Counter,
    pub remote_deleted: Counter,
    pub remote_rejections: Family<Labels, Counter>,
    pub sessions_issued: Counter,
}

impl ApiMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let metrics = Self::default();

        registry.register(
            "ethereal_remote_secrets_created",
            "Remote secrets stored",
            metrics.remote_created.clone(),
        );
        registry.register(
            "ethereal_remote_secrets_retrieved",
            "Remote secrets served",
            metrics.remote_retrieved.clone(),
        );
        registry.register(
            "ethereal_remote_secrets_deleted",
            "Remote secret delete requests honoured",
            metrics.remote_deleted.clone(),
        );
        registry.register(
            "ethereal_remote_rejections",
            "Remote secret requests rejected, by reason",
            metrics.remote_rejections.clone(),
        );
        registry.register(
            "ethereal_session_secrets_issued",
            "Session secrets created",
            metrics.sessions_issued.clone(),
        );

        metrics
    }

    /// Count a rejected remote request. Internal errors are not rejections.
    pub fn reject(&self, err: &EtherealError) {
        let reason = match err {
            EtherealError::Validation(_) => "validation",
            EtherealError::Authentication(_) => "second_factor",
            EtherealError::NotFound(_) => "not_found",
            _ => return,
        };
        self.remote_rejections
            .get_or_create(&vec![("reason".to_string(), reason.to_string())])
            .inc();
    }
}

/// State shared by the metrics listener
#[derive(Clone)]
pub struct HealthState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn KvStore>,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
}

/// Serve Prometheus metrics and health endpoints on `addr` (e.g. "127.0.0.1:9100")
pub async fn serve(addr: String, state: HealthState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("metrics bind {addr}: {e}"))?;

    tracing::info!(addr = %addr, "metrics: listening on /metrics, /healthz, /readyz");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("metrics server: {e}"))
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz_handler(State(state): State<HealthState>) -> impl IntoResponse {
    if ethereal_store::is_healthy(state.store.as_ref()).await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "store unreachable")
    }
}
