//! Store health check

use ethereal_core::EtherealResult;

use crate::KvStore;

const PROBE_KEY: &str = "health:probe";

/// Verify the store answers a cheap read
pub async fn check_health<S: KvStore + ?Sized>(store: &S) -> EtherealResult<()> {
    store.exists(PROBE_KEY).await.map(|_| ())
}

/// Returns true if the store is reachable, false otherwise (non-panicking)
pub async fn is_healthy<S: KvStore + ?Sized>(store: &S) -> bool {
    check_health(store).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn memory_store_is_healthy() {
        let store = MemoryStore::new();
        assert!(is_healthy(&store).await);
        check_health(&store).await.unwrap();
    }
}
