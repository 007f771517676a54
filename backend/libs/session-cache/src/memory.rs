//! In-process backend

use crate::{CacheResult, StateStore, MAX_TTL};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Mutex-guarded map with lazy expiry.
///
/// Every operation sweeps expired entries under the same guard before acting,
/// and `invalidate` scans the whole key space. Both are O(n) in the number of
/// stored keys, so this backend suits single-instance deployments and tests,
/// not large shared key spaces.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    default_ttl: Duration,
}

impl MemoryStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    async fn insert(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        sweep(&mut entries, now);

        let expires_at = if ttl.is_zero() {
            None
        } else {
            // Past the clock's range the entry simply never expires
            now.checked_add(ttl.min(MAX_TTL))
        };
        entries.insert(key.to_string(), Entry { value, expires_at });
    }
}

fn sweep(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now));
    before - entries.len()
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        sweep(&mut entries, Instant::now());
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> CacheResult<()> {
        self.insert(key, value, self.default_ttl).await;
        Ok(())
    }

    async fn set_with_expiration(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> CacheResult<()> {
        self.insert(key, value, ttl).await;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        sweep(&mut entries, Instant::now());
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn invalidate(&self, prefix: &str) -> CacheResult<usize> {
        let pattern = Regex::new(&format!("^{}", regex::escape(prefix)))?;

        let mut entries = self.entries.lock().await;
        sweep(&mut entries, Instant::now());

        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        let removed = before - entries.len();

        debug!(prefix = %prefix, removed, "Memory cache invalidate");
        Ok(removed)
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        let mut entries = self.entries.lock().await;
        Ok(sweep(&mut entries, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> MemoryStore {
        MemoryStore::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = store();
        store.set("a", "1".to_string()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.delete(&["a", "never-set"]).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        assert!(store().get("nope").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = store();
        store
            .set_with_expiration("k", "v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies_to_set() {
        let store = MemoryStore::new(Duration::from_secs(5));
        store.set("k", "v".to_string()).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let store = store();
        store
            .set_with_expiration("k", "v".to_string(), Duration::ZERO)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let store = store();
        store
            .set_with_expiration("k", "v".to_string(), Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        store
            .set_with_expiration("max", "v".to_string(), Duration::MAX)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(86_400 * 365)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("max").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = store();
        store.set("k", "old".to_string()).await.unwrap();
        store.set("k", "new".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_invalidate_removes_exactly_matching_keys() {
        let store = store();
        for key in [
            "register.alice@example.com",
            "register.bob@example.com",
            "recovery_password.alice@example.com",
            "registered.carol",
            "xregister.dave",
        ] {
            store.set(key, "v".to_string()).await.unwrap();
        }

        let removed = store.invalidate("register.").await.unwrap();
        assert_eq!(removed, 2);

        assert!(store.get("register.alice@example.com").await.unwrap().is_none());
        assert!(store.get("register.bob@example.com").await.unwrap().is_none());
        assert!(store
            .get("recovery_password.alice@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(store.get("registered.carol").await.unwrap().is_some());
        assert!(store.get("xregister.dave").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_treats_prefix_literally() {
        let store = store();
        store.set("a+b.1", "v".to_string()).await.unwrap();
        store.set("aab.1", "v".to_string()).await.unwrap();

        assert_eq!(store.invalidate("a+b.").await.unwrap(), 1);
        assert!(store.get("aab.1").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_counts_swept_entries() {
        let store = store();
        store
            .set_with_expiration("short", "v".to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        store
            .set_with_expiration("long", "v".to_string(), Duration::from_secs(100))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_one_value() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set("shared", i.to_string()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let value = store.get("shared").await.unwrap().unwrap();
        let n: usize = value.parse().unwrap();
        assert!(n < 16);
    }
}
