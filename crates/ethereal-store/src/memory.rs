//! In-process TTL store.
//!
//! Expired entries are invisible from the moment their deadline passes and
//! are physically dropped either on access or by [`MemoryStore::evict_expired`],
//! which the daemon runs periodically to bound memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethereal_core::EtherealResult;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{KvStore, TTL_MISSING, TTL_PERSISTENT};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Thread-safe key/value map with Redis-like expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry whose TTL has elapsed. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.lock().await;
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        before - map.len()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let map = self.entries.lock().await;
        map.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Run [`evict_expired`](Self::evict_expired) every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.evict_expired().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "store: swept expired entries");
                }
            }
        })
    }
}

/// Look up `key`, removing it first if it has expired.
fn live_entry<'a>(map: &'a mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<&'a mut Entry> {
    if map.get(key).is_some_and(|e| !e.is_live(now)) {
        map.remove(key);
    }
    map.get_mut(key)
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> EtherealResult<Option<String>> {
        let mut map = self.entries.lock().await;
        Ok(live_entry(&mut map, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> EtherealResult<()> {
        let mut map = self.entries.lock().await;
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> EtherealResult<bool> {
        let now = Instant::now();
        let mut map = self.entries.lock().await;
        if seconds == 0 {
            // Redis semantics: a non-positive TTL deletes the key
            return Ok(map.remove(key).is_some_and(|e| e.is_live(now)));
        }
        match live_entry(&mut map, key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + Duration::from_secs(seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> EtherealResult<i64> {
        let now = Instant::now();
        let mut map = self.entries.lock().await;
        Ok(match live_entry(&mut map, key, now) {
            None => TTL_MISSING,
            Some(Entry {
                expires_at: None, ..
            }) => TTL_PERSISTENT,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining_ms = at.saturating_duration_since(now).as_millis();
                // Rounded to the nearest second, like Redis
                ((remaining_ms + 500) / 1000) as i64
            }
        })
    }

    async fn del(&self, key: &str) -> EtherealResult<u64> {
        let now = Instant::now();
        let mut map = self.entries.lock().await;
        Ok(match map.remove(key) {
            Some(entry) if entry.is_live(now) => 1,
            _ => 0,
        })
    }

    async fn exists(&self, key: &str) -> EtherealResult<bool> {
        let mut map = self.entries.lock().await;
        Ok(live_entry(&mut map, key, Instant::now()).is_some())
    }
}
