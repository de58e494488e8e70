//! Shared state handed to every API handler

use std::sync::Arc;

use ethereal_core::config::EtherealConfig;
use ethereal_core::EtherealResult;
use ethereal_store::KvStore;

use crate::metrics::ApiMetrics;
use crate::remote::RemoteSecretService;
use crate::session::{SessionCookie, SessionSecretIssuer};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionSecretIssuer>,
    pub cookie: Arc<SessionCookie>,
    pub remote: Arc<RemoteSecretService>,
    pub remote_enabled: bool,
    pub metrics: ApiMetrics,
}

impl AppState {
    /// Wire the protocol services to `store`. `config` must already be validated.
    pub fn new(
        config: &EtherealConfig,
        store: Arc<dyn KvStore>,
        metrics: ApiMetrics,
    ) -> EtherealResult<Self> {
        let cookie = SessionCookie::from_config(&config.local.cookie, config.local.ttl_secs)?;
        Ok(Self {
            sessions: Arc::new(SessionSecretIssuer::new(
                store.clone(),
                config.local.ttl_secs,
            )),
            cookie: Arc::new(cookie),
            remote: Arc::new(RemoteSecretService::new(store, config.remote.clone())),
            remote_enabled: config.remote.enabled,
            metrics,
        })
    }
}
