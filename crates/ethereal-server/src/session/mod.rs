//! Session-bound secrets for local encryption
//!
//! Each browser session owns one 256-bit secret, created on first request and
//! returned unchanged afterwards. The record lives in the store under
//! `sess:<session id>` and expires with the session.

pub mod cookie;

pub use cookie::SessionCookie;

use std::sync::Arc;

use ethereal_core::EtherealResult;
use ethereal_crypto::{generate_session_secret, SharedSecret};
use ethereal_store::KvStore;
use rand::RngCore;

const SESSION_PREFIX: &str = "sess:";

/// Session state for one request, passed explicitly into the issuer.
#[derive(Debug)]
pub struct SessionContext {
    id: String,
    secret: Option<SharedSecret>,
    is_new: bool,
}

impl SessionContext {
    /// A fresh session with a random 256-bit hex id.
    pub fn fresh() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            id: hex::encode(bytes),
            secret: None,
            is_new: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True if this session did not exist before the current request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }
}

/// Issues and retrieves per-session secrets.
pub struct SessionSecretIssuer {
    store: Arc<dyn KvStore>,
    ttl_secs: u64,
}

impl SessionSecretIssuer {
    pub fn new(store: Arc<dyn KvStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    fn record_key(session_id: &str) -> String {
        format!("{SESSION_PREFIX}{session_id}")
    }

    /// Resume the session named by a verified cookie, or start a fresh one if
    /// there is none or it has expired.
    pub async fn load(&self, session_id: Option<&str>) -> EtherealResult<SessionContext> {
        if let Some(id) = session_id {
            if let Some(secret) = self.store.get(&Self::record_key(id)).await? {
                return Ok(SessionContext {
                    id: id.to_string(),
                    secret: Some(SharedSecret::new(secret)),
                    is_new: false,
                });
            }
        }
        Ok(SessionContext::fresh())
    }

    /// Return the session's secret, creating and persisting one if needed.
    ///
    /// Idempotent: a session that already carries a secret gets it back unchanged.
    pub async fn get_or_create(&self, ctx: &mut SessionContext) -> EtherealResult<SharedSecret> {
        if let Some(secret) = &ctx.secret {
            return Ok(secret.clone());
        }

        let secret = generate_session_secret();
        let key = Self::record_key(&ctx.id);
        self.store.set(&key, secret.expose()).await?;
        self.store.expire(&key, self.ttl_secs).await?;
        ctx.secret = Some(secret.clone());
        Ok(secret)
    }
}
