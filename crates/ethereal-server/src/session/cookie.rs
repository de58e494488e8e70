//! Signed session cookie: `<name>=<session id>.<mac>`
//!
//! `mac` is base64url(HMAC-SHA256(cookie secret, session id)). A cookie whose
//! MAC does not verify is ignored, so clients cannot pick their session id.

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ethereal_core::config::CookieConfig;
use ethereal_core::{EtherealError, EtherealResult};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies the session cookie.
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    path: String,
    same_site: &'static str,
    secure: bool,
    max_age_secs: u64,
    keyed_mac: HmacSha256,
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .field("max_age_secs", &self.max_age_secs)
            .field("keyed_mac", &"[REDACTED]")
            .finish()
    }
}

impl SessionCookie {
    /// Build from config. Without a configured secret, a random one is used
    /// for the lifetime of the process.
    pub fn from_config(config: &CookieConfig, max_age_secs: u64) -> EtherealResult<Self> {
        let mut key = match &config.secret {
            Some(secret) if !secret.is_empty() => secret.as_bytes().to_vec(),
            _ => {
                tracing::warn!("local.cookie.secret not set: sessions will not survive a restart");
                let mut key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                hex::encode(key).into_bytes()
            }
        };

        let same_site = match config.same_site.to_ascii_lowercase().as_str() {
            "strict" => "Strict",
            "lax" => "Lax",
            "none" => "None",
            other => {
                return Err(EtherealError::Config(format!(
                    "unknown cookie same_site value: {other}"
                )))
            }
        };

        // HMAC accepts keys of any length
        let keyed_mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| EtherealError::Config(format!("cookie secret: {e}")))?;
        key.zeroize();

        Ok(Self {
            name: config.name.clone(),
            path: config.path.clone(),
            same_site,
            secure: config.secure,
            max_age_secs,
            keyed_mac,
        })
    }

    fn mac(&self, session_id: &str) -> HmacSha256 {
        let mut mac = self.keyed_mac.clone();
        mac.update(session_id.as_bytes());
        mac
    }

    /// Signed cookie value for `session_id`.
    pub fn sign(&self, session_id: &str) -> String {
        let tag = self.mac(session_id).finalize().into_bytes();
        format!("{session_id}.{}", URL_SAFE_NO_PAD.encode(tag))
    }

    /// Session id carried by a signed cookie value, if its MAC verifies.
    pub fn verify(&self, value: &str) -> Option<String> {
        let (session_id, tag) = value.rsplit_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        self.mac(session_id).verify_slice(&tag).ok()?;
        Some(session_id.to_string())
    }

    /// Verified session id from the request's `Cookie` headers.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == self.name)
            .find_map(|(_, value)| self.verify(value))
    }

    /// `Set-Cookie` header for a newly created session.
    pub fn set_cookie(&self, session_id: &str) -> EtherealResult<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
            self.name,
            self.sign(session_id),
            self.path,
            self.max_age_secs,
            self.same_site
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| EtherealError::Config(format!("invalid cookie attributes: {e}")))
    }
}
