use serde::{Deserialize, Serialize};

use crate::error::{EtherealError, EtherealResult};

/// Top-level service configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtherealConfig {
    pub server: ServerConfig,
    pub local: LocalConfig,
    pub remote: RemoteConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address for the secrets API (default: 0.0.0.0:8080)
    pub listen: String,
    /// Prometheus metrics endpoint (default: 127.0.0.1:9100)
    pub metrics_addr: Option<String>,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

/// Session-bound secrets used for local encryption
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Session lifetime in seconds (default: 4 hours)
    pub ttl_secs: u64,
    pub cookie: CookieConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Session cookie name (default: sessionid)
    pub name: String,
    /// Cookie signing secret. A random one is generated at startup when unset,
    /// which invalidates all sessions on restart.
    pub secret: Option<String>,
    /// Only send the cookie over HTTPS (default: true)
    pub secure: bool,
    pub path: String,
    /// SameSite attribute: "strict", "lax" or "none"
    pub same_site: String,
}

/// Split-key remote secrets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Mount the remote secret endpoints (default: false)
    pub enabled: bool,
    /// TTL used when the client asks for none or an invalid one (default: 2 days)
    pub default_ttl_secs: u64,
    /// Largest TTL a client may request (default: 7 days)
    pub max_ttl_secs: u64,
    /// Maximum length of the serialized envelope in bytes
    pub max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Interval between expiry sweeps of the in-memory store
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            metrics_addr: Some("127.0.0.1:9100".into()),
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 4 * 60 * 60,
            cookie: CookieConfig::default(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "sessionid".into(),
            secret: None,
            secure: true,
            path: "/".into(),
            same_site: "strict".into(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_ttl_secs: 2 * 24 * 60 * 60,
            max_ttl_secs: 7 * 24 * 60 * 60,
            max_length: 64 * 1000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
        }
    }
}

impl EtherealConfig {
    /// Parse a TOML document, filling every missing field with its default.
    pub fn from_toml(content: &str) -> EtherealResult<Self> {
        toml::from_str(content).map_err(|e| EtherealError::Config(e.to_string()))
    }

    /// Reject settings the service cannot run with. Called once at startup.
    pub fn validate(&self) -> EtherealResult<()> {
        if self.local.ttl_secs == 0 {
            return Err(EtherealError::Config("local.ttl_secs must be > 0".into()));
        }
        if self.local.cookie.name.is_empty() {
            return Err(EtherealError::Config(
                "local.cookie.name must not be empty".into(),
            ));
        }
        if !matches!(
            self.local.cookie.same_site.to_ascii_lowercase().as_str(),
            "strict" | "lax" | "none"
        ) {
            return Err(EtherealError::Config(format!(
                "local.cookie.same_site must be strict, lax or none (got {:?})",
                self.local.cookie.same_site
            )));
        }
        if self.remote.default_ttl_secs == 0 || self.remote.max_ttl_secs == 0 {
            return Err(EtherealError::Config("remote TTLs must be > 0".into()));
        }
        if self.remote.default_ttl_secs > self.remote.max_ttl_secs {
            return Err(EtherealError::Config(format!(
                "remote.default_ttl_secs ({}) exceeds remote.max_ttl_secs ({})",
                self.remote.default_ttl_secs, self.remote.max_ttl_secs
            )));
        }
        if self.remote.max_length == 0 {
            return Err(EtherealError::Config("remote.max_length must be > 0".into()));
        }
        if self.store.sweep_interval_secs == 0 {
            return Err(EtherealError::Config(
                "store.sweep_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
