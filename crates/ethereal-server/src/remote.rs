//! Split-key remote secrets
//!
//! Store layout:
//! ```text
//! remote:<uuid>               serialized envelope, TTL = effective ttl
//! remote:<uuid>:secondFactor  caller-supplied string, same TTL (optional)
//! ```
//! The envelope is sealed with a local secret the service never sees, so
//! the service only bounds size and lifetime and enforces the second factor.
//!
//! The two writes in [`RemoteSecretService::store`] and the gate-then-act
//! sequences in `retrieve`/`remove` are not atomic against the store. A
//! concurrent delete can surface as a transient 404.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ethereal_core::config::RemoteConfig;
use ethereal_core::{EtherealError, EtherealResult};
use ethereal_store::KvStore;
use serde_json::Value;
use subtle::ConstantTimeEq;
use uuid::Uuid;

const REMOTE_PREFIX: &str = "remote:";
const SECOND_FACTOR_SUFFIX: &str = ":secondFactor";

/// Result of a successful `store`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub remote_key: String,
    pub expiry_date: DateTime<Utc>,
    pub ttl_secs: u64,
}

/// Result of a successful `retrieve`.
#[derive(Clone, PartialEq, Eq)]
pub struct RetrievedSecret {
    pub data: String,
    pub expiry_date: DateTime<Utc>,
}

impl std::fmt::Debug for RetrievedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievedSecret")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}

pub struct RemoteSecretService {
    store: Arc<dyn KvStore>,
    config: RemoteConfig,
}

fn data_key(remote_key: &str) -> String {
    format!("{REMOTE_PREFIX}{}", remote_key.to_ascii_lowercase())
}

fn second_factor_key(remote_key: &str) -> String {
    format!("{}{SECOND_FACTOR_SUFFIX}", data_key(remote_key))
}

impl RemoteSecretService {
    pub fn new(store: Arc<dyn KvStore>, config: RemoteConfig) -> Self {
        Self { store, config }
    }

    /// TTL to apply for a requested value.
    ///
    /// Accepts a positive JSON integer or a string of decimal digits no larger
    /// than `max_ttl_secs`. Anything else yields `default_ttl_secs`.
    pub fn effective_ttl(&self, requested: Option<&Value>) -> u64 {
        let parsed = match requested {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse::<u64>().ok()
            }
            _ => None,
        };
        parsed
            .filter(|ttl| *ttl > 0 && *ttl <= self.config.max_ttl_secs)
            .unwrap_or(self.config.default_ttl_secs)
    }

    /// Persist an envelope under a fresh random key.
    ///
    /// An empty `second_factor` means none.
    pub async fn store(
        &self,
        data: Option<&str>,
        requested_ttl: Option<&Value>,
        second_factor: Option<&str>,
    ) -> EtherealResult<StoredSecret> {
        let data = match data {
            Some(d) if !d.is_empty() => d,
            _ => return Err(EtherealError::Validation("data is missing".into())),
        };
        if data.len() > self.config.max_length {
            return Err(EtherealError::Validation(format!(
                "data is {} bytes (maximum {})",
                data.len(),
                self.config.max_length
            )));
        }

        let ttl_secs = self.effective_ttl(requested_ttl);
        let remote_key = Uuid::new_v4().to_string();

        let key = data_key(&remote_key);
        self.store.set(&key, data).await?;
        self.store.expire(&key, ttl_secs).await?;

        if let Some(factor) = second_factor.filter(|f| !f.is_empty()) {
            let key = second_factor_key(&remote_key);
            self.store.set(&key, factor).await?;
            self.store.expire(&key, ttl_secs).await?;
        }

        Ok(StoredSecret {
            remote_key,
            expiry_date: expiry_after(ttl_secs),
            ttl_secs,
        })
    }

    /// Fetch an envelope without consuming it.
    pub async fn retrieve(
        &self,
        remote_key: &str,
        second_factor: Option<&str>,
    ) -> EtherealResult<RetrievedSecret> {
        let key = data_key(remote_key);
        let data = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| EtherealError::NotFound(format!("remote secret {remote_key}")))?;

        self.check_second_factor(remote_key, second_factor).await?;

        let ttl = self.store.ttl(&key).await?;
        if ttl < 0 {
            return Err(EtherealError::ServerInconsistency(format!(
                "remote secret {remote_key} has ttl {ttl}"
            )));
        }

        Ok(RetrievedSecret {
            data,
            expiry_date: expiry_after(ttl.unsigned_abs()),
        })
    }

    /// Delete a secret and its second factor. Deleting a missing secret succeeds.
    pub async fn remove(&self, remote_key: &str, second_factor: Option<&str>) -> EtherealResult<()> {
        self.check_second_factor(remote_key, second_factor).await?;
        self.store.del(&second_factor_key(remote_key)).await?;
        self.store.del(&data_key(remote_key)).await?;
        Ok(())
    }

    async fn check_second_factor(
        &self,
        remote_key: &str,
        supplied: Option<&str>,
    ) -> EtherealResult<()> {
        let Some(expected) = self.store.get(&second_factor_key(remote_key)).await? else {
            return Ok(());
        };
        let matches = supplied
            .map(|s| bool::from(s.as_bytes().ct_eq(expected.as_bytes())))
            .unwrap_or(false);
        if matches {
            Ok(())
        } else {
            Err(EtherealError::Authentication(
                "second factor missing or mismatched".into(),
            ))
        }
    }
}

fn expiry_after(ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    Duration::try_seconds(secs)
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereal_store::MemoryStore;
    use serde_json::json;

    fn config() -> RemoteConfig {
        RemoteConfig {
            enabled: true,
            default_ttl_secs: 1000,
            max_ttl_secs: 5000,
            max_length: 64,
        }
    }

    fn service() -> (Arc<MemoryStore>, RemoteSecretService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), RemoteSecretService::new(store, config()))
    }

    #[test]
    fn test_effective_ttl() {
        let (_, svc) = service();
        assert_eq!(svc.effective_ttl(None), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!(1337))), 1337);
        assert_eq!(svc.effective_ttl(Some(&json!("1337"))), 1337);
        assert_eq!(svc.effective_ttl(Some(&json!(5000))), 5000);
        assert_eq!(svc.effective_ttl(Some(&json!(5001))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!(0))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!(-5))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!(12.5))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!("foo"))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!("-5"))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!(""))), 1000);
        assert_eq!(svc.effective_ttl(Some(&json!({"ttl": 5}))), 1000);
        assert_eq!(svc.effective_ttl(Some(&Value::Null)), 1000);
    }

    #[tokio::test]
    async fn store_and_retrieve() {
        let (store, svc) = service();
        let stored = svc.store(Some("envelope"), None, None).await.unwrap();
        assert!(ethereal_core::is_uuid(&stored.remote_key));
        assert_eq!(stored.ttl_secs, 1000);

        let key = format!("remote:{}", stored.remote_key);
        assert_eq!(store.ttl(&key).await.unwrap(), 1000);

        let got = svc.retrieve(&stored.remote_key, None).await.unwrap();
        assert_eq!(got.data, "envelope");
        let drift = (got.expiry_date - stored.expiry_date).num_seconds().abs();
        assert!(drift <= 1);

        // reads do not consume
        assert!(svc.retrieve(&stored.remote_key, None).await.is_ok());
    }

    #[tokio::test]
    async fn store_rejects_missing_or_oversized_data() {
        let (_, svc) = service();
        for data in [None, Some("")] {
            assert!(matches!(
                svc.store(data, None, None).await,
                Err(EtherealError::Validation(_))
            ));
        }
        let big = "x".repeat(65);
        assert!(matches!(
            svc.store(Some(big.as_str()), None, None).await,
            Err(EtherealError::Validation(_))
        ));
        let exact = "x".repeat(64);
        assert!(svc.store(Some(exact.as_str()), None, None).await.is_ok());
    }

    #[tokio::test]
    async fn out_of_range_ttl_uses_default() {
        let (store, svc) = service();
        let stored = svc
            .store(Some("envelope"), Some(&json!(999_999)), None)
            .await
            .unwrap();
        assert_eq!(stored.ttl_secs, 1000);
        let key = format!("remote:{}", stored.remote_key);
        assert_eq!(store.ttl(&key).await.unwrap(), 1000);

        let stored = svc
            .store(Some("envelope"), Some(&json!("foo")), None)
            .await
            .unwrap();
        assert_eq!(stored.ttl_secs, 1000);
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let (_, svc) = service();
        let err = svc
            .retrieve("decafbad-dead-dead-dead-decafbadadad", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EtherealError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_factor_gates_retrieve_and_remove() {
        let (store, svc) = service();
        let stored = svc
            .store(Some("envelope"), Some(&json!(300)), Some("x"))
            .await
            .unwrap();
        let key = &stored.remote_key;

        let sf_key = format!("remote:{key}:secondFactor");
        assert_eq!(
            store.ttl(&sf_key).await.unwrap(),
            store.ttl(&format!("remote:{key}")).await.unwrap()
        );

        for supplied in [None, Some("y"), Some(""), Some("xx")] {
            assert!(matches!(
                svc.retrieve(key, supplied).await,
                Err(EtherealError::Authentication(_))
            ));
            assert!(matches!(
                svc.remove(key, supplied).await,
                Err(EtherealError::Authentication(_))
            ));
        }
        assert_eq!(svc.retrieve(key, Some("x")).await.unwrap().data, "envelope");

        svc.remove(key, Some("x")).await.unwrap();
        assert!(!store.exists(&sf_key).await.unwrap());
        assert!(matches!(
            svc.retrieve(key, Some("x")).await,
            Err(EtherealError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_second_factor_means_none() {
        let (store, svc) = service();
        let stored = svc.store(Some("envelope"), None, Some("")).await.unwrap();
        let sf_key = format!("remote:{}:secondFactor", stored.remote_key);
        assert!(!store.exists(&sf_key).await.unwrap());
        assert!(svc.retrieve(&stored.remote_key, None).await.is_ok());
    }

    #[tokio::test]
    async fn not_found_is_checked_before_second_factor() {
        let (store, svc) = service();
        let stored = svc.store(Some("envelope"), None, Some("x")).await.unwrap();
        store
            .del(&format!("remote:{}", stored.remote_key))
            .await
            .unwrap();
        assert!(matches!(
            svc.retrieve(&stored.remote_key, None).await,
            Err(EtherealError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_, svc) = service();
        let stored = svc.store(Some("envelope"), None, None).await.unwrap();
        svc.remove(&stored.remote_key, None).await.unwrap();
        svc.remove(&stored.remote_key, None).await.unwrap();
        assert!(matches!(
            svc.retrieve(&stored.remote_key, None).await,
            Err(EtherealError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn keys_are_case_insensitive() {
        let (_, svc) = service();
        let stored = svc.store(Some("envelope"), None, None).await.unwrap();
        let upper = stored.remote_key.to_uppercase();
        assert_eq!(svc.retrieve(&upper, None).await.unwrap().data, "envelope");
    }

    #[tokio::test]
    async fn persistent_record_is_an_inconsistency() {
        let (store, svc) = service();
        let key = "decafbad-dead-dead-dead-decafbadadad";
        store.set(&format!("remote:{key}"), "envelope").await.unwrap();
        assert!(matches!(
            svc.retrieve(key, None).await,
            Err(EtherealError::ServerInconsistency(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn records_expire_together() {
        let (store, svc) = service();
        let stored = svc
            .store(Some("envelope"), Some(&json!(10)), Some("x"))
            .await
            .unwrap();
        tokio::time::advance(std::time::Duration::from_secs(11)).await;
        assert!(matches!(
            svc.retrieve(&stored.remote_key, Some("x")).await,
            Err(EtherealError::NotFound(_))
        ));
        assert!(store.is_empty().await);
    }
}
