//! The client facade
//!
//! ```text
//! save_local  ─▶ GET /            session secret ─▶ seal ─▶ LocalStorage
//! save_remote ─▶ local secret ─▶ seal ─▶ POST /   ─▶ "<key>;<local secret>"
//! get_remote  ─▶ parse fragment ─▶ GET /<key>     ─▶ open with local secret
//! ```
//! Remote operations take `&self`. Local operations take `&mut self`
//! because they may fill the session-secret cache; share a client across
//! tasks behind a lock if needed.

use chrono::{DateTime, Utc};
use ethereal_core::types::{
    parse_http_date, CreateSecretRequest, CreateSecretResponse, RetrieveSecretResponse,
    SessionKeyResponse,
};
use ethereal_core::{EtherealError, EtherealResult, FragmentIdentifier};
use ethereal_crypto::{generate_local_secret, Codec, KdfParams, SharedSecret};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::storage::{LocalStorage, MemoryStorage};

const SECOND_FACTOR_PARAM: &str = "secondFactor";

/// Options for [`EtherealClient::save_remote`].
#[derive(Debug, Clone, Default)]
pub struct SaveRemoteOptions {
    /// Requested lifetime in seconds. The service falls back to its default
    /// when this is out of range.
    pub ttl: Option<u64>,
    pub second_factor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteSaveResult {
    /// `<remoteKey>;<localKey>`, the only way back to the clear text.
    pub fragment_identifier: FragmentIdentifier,
    pub expiry_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct RemoteRetrieveResult {
    pub clear_text: String,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for RemoteRetrieveResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRetrieveResult")
            .field("clear_text", &"[REDACTED]")
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}

pub struct EtherealClient {
    http: Client,
    endpoint: Url,
    codec: Codec,
    cache_key: bool,
    cached_key: Option<SharedSecret>,
    storage: Box<dyn LocalStorage>,
}

impl EtherealClient {
    /// Client backed by an in-memory [`MemoryStorage`].
    pub fn new(config: ClientConfig) -> EtherealResult<Self> {
        Self::with_storage(config, Box::new(MemoryStorage::new()))
    }

    pub fn with_storage(
        config: ClientConfig,
        storage: Box<dyn LocalStorage>,
    ) -> EtherealResult<Self> {
        let endpoint = Url::parse(&config.normalized_endpoint()).map_err(|e| {
            EtherealError::Config(format!("invalid endpoint {:?}: {e}", config.endpoint))
        })?;

        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| EtherealError::Transport(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            codec: Codec::new(KdfParams {
                iterations: config.kdf_iterations,
            }),
            cache_key: config.cache_key,
            cached_key: None,
            storage,
        })
    }

    pub fn storage(&self) -> &dyn LocalStorage {
        self.storage.as_ref()
    }

    // ── Local secrets ────────────────────────────────────────────────────

    /// Seal `clear_text` with the session secret and store it under `name`.
    pub async fn save_local(&mut self, name: &str, clear_text: &str) -> EtherealResult<()> {
        let secret = self.retrieve_session_secret().await?;
        let sealed = seal(self.codec, secret, clear_text.to_string()).await?;
        self.storage.set_item(name, sealed);
        debug!(name, "local: secret saved");
        Ok(())
    }

    /// Clear text stored under `name`, or `None` if nothing is stored.
    ///
    /// A stored envelope that does not open is an error, not an absence.
    pub async fn get_local(&mut self, name: &str) -> EtherealResult<Option<String>> {
        let Some(sealed) = self.storage.get_item(name).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let secret = self.retrieve_session_secret().await?;
        open(self.codec, secret, sealed).await.map(Some)
    }

    pub fn remove_local(&mut self, name: &str) {
        self.storage.remove_item(name);
    }

    /// Fetch (or create) this session's secret from the service.
    pub async fn retrieve_session_secret(&mut self) -> EtherealResult<SharedSecret> {
        if let Some(secret) = &self.cached_key {
            return Ok(secret.clone());
        }

        let response = send(self.http.get(self.endpoint.clone())).await?;
        let body: SessionKeyResponse = read_json(response).await?;
        let secret = body
            .key
            .map(SharedSecret::new)
            .ok_or_else(|| EtherealError::Transport("the server did not answer with a key".into()))?;

        if self.cache_key {
            self.cached_key = Some(secret.clone());
        }
        Ok(secret)
    }

    // ── Remote secrets ───────────────────────────────────────────────────

    /// Seal `clear_text` under a fresh local secret and upload the envelope.
    pub async fn save_remote(
        &self,
        clear_text: &str,
        options: SaveRemoteOptions,
    ) -> EtherealResult<RemoteSaveResult> {
        let local_secret = generate_local_secret();
        let sealed = seal(self.codec, local_secret.clone(), clear_text.to_string()).await?;

        let request = CreateSecretRequest {
            data: Some(sealed),
            ttl: options.ttl.map(Value::from),
            second_factor: options.second_factor,
        };
        let response = send(self.http.post(self.endpoint.clone()).json(&request)).await?;
        let body: CreateSecretResponse = read_json(response).await?;

        let remote_key = body
            .key
            .ok_or_else(|| EtherealError::Transport("the server did not answer with a key".into()))?;
        let fragment_identifier = FragmentIdentifier::new(&remote_key, local_secret.expose())
            .map_err(|_| {
                EtherealError::Transport(format!("the server answered with a malformed key: {remote_key}"))
            })?;

        debug!(remote_key = %remote_key, "remote: secret saved");
        Ok(RemoteSaveResult {
            fragment_identifier,
            expiry_date: body.expiry_date.as_deref().and_then(parse_http_date),
        })
    }

    /// Download and open the secret addressed by `fragment_identifier`.
    ///
    /// A malformed identifier fails before any request is made.
    pub async fn get_remote(
        &self,
        fragment_identifier: &str,
        second_factor: Option<&str>,
    ) -> EtherealResult<RemoteRetrieveResult> {
        let fragment = FragmentIdentifier::parse(fragment_identifier)?;
        let url = self.remote_url(&fragment)?;

        let response = send(with_second_factor(self.http.get(url), second_factor)).await?;
        let body: RetrieveSecretResponse = read_json(response).await?;
        let sealed = body.data.ok_or_else(|| {
            EtherealError::Transport("the server did not answer with any data".into())
        })?;

        let local_secret = SharedSecret::new(fragment.local_key());
        let clear_text = open(self.codec, local_secret, sealed).await?;

        debug!(remote_key = %fragment.remote_key(), "remote: secret retrieved");
        Ok(RemoteRetrieveResult {
            clear_text,
            expiry_date: body.expiry_date.as_deref().and_then(parse_http_date),
        })
    }

    /// Delete the secret addressed by `fragment_identifier`.
    pub async fn remove_remote(
        &self,
        fragment_identifier: &str,
        second_factor: Option<&str>,
    ) -> EtherealResult<()> {
        let fragment = FragmentIdentifier::parse(fragment_identifier)?;
        let url = self.remote_url(&fragment)?;
        send(with_second_factor(self.http.delete(url), second_factor)).await?;
        debug!(remote_key = %fragment.remote_key(), "remote: secret removed");
        Ok(())
    }

    fn remote_url(&self, fragment: &FragmentIdentifier) -> EtherealResult<Url> {
        self.endpoint
            .join(fragment.remote_key())
            .map_err(|e| EtherealError::Config(format!("building request URL: {e}")))
    }
}

fn with_second_factor(request: RequestBuilder, second_factor: Option<&str>) -> RequestBuilder {
    match second_factor {
        Some(factor) => request.query(&[(SECOND_FACTOR_PARAM, factor)]),
        None => request,
    }
}

/// Send a request and map a non-success status onto the error taxonomy.
async fn send(request: RequestBuilder) -> EtherealResult<Response> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| EtherealError::Transport(format!("request failed: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let message = format!("the server answered {code}");
    Err(match code {
        400 => EtherealError::Validation(message),
        401 => EtherealError::Authentication(message),
        404 => EtherealError::NotFound(message),
        _ => EtherealError::Server {
            status: code,
            message: status.canonical_reason().unwrap_or("unexpected status").to_string(),
        },
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> EtherealResult<T> {
    response
        .json()
        .await
        .map_err(|e| EtherealError::Transport(format!("unreadable response body: {e}")))
}

// PBKDF2 at full strength takes long enough to stall the runtime, so the
// codec runs on the blocking pool.

async fn seal(codec: Codec, secret: SharedSecret, clear_text: String) -> EtherealResult<String> {
    tokio::task::spawn_blocking(move || codec.seal(&secret, &clear_text))
        .await
        .map_err(|e| EtherealError::Other(anyhow::anyhow!("encryption task: {e}")))?
}

async fn open(codec: Codec, secret: SharedSecret, sealed: String) -> EtherealResult<String> {
    tokio::task::spawn_blocking(move || codec.open(&secret, &sealed))
        .await
        .map_err(|e| EtherealError::Other(anyhow::anyhow!("decryption task: {e}")))?
}
