//! ethereal-store: the ephemeral key/value capability the service depends on
//!
//! The service never talks to a concrete store, only to [`KvStore`], whose
//! contract mirrors the Redis commands it needs (GET/SET/EXPIRE/TTL/DEL/EXISTS).
//! Expiry is the store's job: a key vanishes once its TTL reaches zero.

pub mod health;
pub mod memory;

pub use health::{check_health, is_healthy};
pub use memory::MemoryStore;

use async_trait::async_trait;
use ethereal_core::EtherealResult;

/// `ttl` answer for a key that does not exist
pub const TTL_MISSING: i64 = -2;

/// `ttl` answer for a key that exists without an expiry
pub const TTL_PERSISTENT: i64 = -1;

/// A TTL-capable key/value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> EtherealResult<Option<String>>;

    /// Store `value` under `key` without expiry, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str) -> EtherealResult<()>;

    /// Expire `key` after `seconds`. Returns false if the key does not exist.
    async fn expire(&self, key: &str, seconds: u64) -> EtherealResult<bool>;

    /// Remaining lifetime in whole seconds, [`TTL_PERSISTENT`] or [`TTL_MISSING`].
    async fn ttl(&self, key: &str) -> EtherealResult<i64>;

    /// Delete `key`. Returns the number of keys removed (0 or 1).
    async fn del(&self, key: &str) -> EtherealResult<u64>;

    async fn exists(&self, key: &str) -> EtherealResult<bool>;
}
