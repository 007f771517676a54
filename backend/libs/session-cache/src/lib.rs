//! Ephemeral state store for identity sessions
//!
//! A TTL key/value store with prefix invalidation, used for token revocation
//! entries and pending OTP verifications. Two interchangeable backends:
//! - [`MemoryStore`]: in-process map, single-instance deployments and tests
//! - [`RedisStore`]: shared Redis, SCAN-based prefix invalidation
//!
//! Both backends store the same JSON text and behave identically from the
//! caller's side: a key that is absent or past its TTL reads as `None`.

mod error;
mod keys;
mod memory;
mod redis_store;

pub use error::{CacheError, CacheResult};
pub use keys::{cache_key, escape_glob};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default TTL for `set` when the backend is built without one (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Longest expiry either backend stores (100 years); larger TTLs are clamped
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Core key/value operations. Object safe so a backend can be chosen at startup
/// and shared as `Arc<dyn StateStore>`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Raw value for `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store with the backend's default TTL
    async fn set(&self, key: &str, value: String) -> CacheResult<()>;

    /// Store with an explicit TTL. `Duration::ZERO` stores without expiry.
    async fn set_with_expiration(&self, key: &str, value: String, ttl: Duration)
        -> CacheResult<()>;

    /// Delete keys; missing keys are ignored
    async fn delete(&self, keys: &[&str]) -> CacheResult<()>;

    /// Delete every key starting with `prefix`, returning how many were removed
    async fn invalidate(&self, prefix: &str) -> CacheResult<usize>;

    /// Drop expired entries. Backends with native key expiry return 0.
    async fn purge_expired(&self) -> CacheResult<usize>;
}

/// JSON helpers available on every [`StateStore`], including `dyn StateStore`
#[async_trait]
pub trait StateStoreExt: StateStore {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Undecodable entries read as missing; TTL reclaims them
                warn!(key = %key, error = %e, "Cache deserialization failed");
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await
    }

    async fn set_json_with_expiration<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_with_expiration(key, raw, ttl).await
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pending {
        otp: String,
        email: String,
    }

    #[tokio::test]
    async fn test_json_helpers_through_trait_object() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new(DEFAULT_TTL));
        let value = Pending {
            otp: "123456".to_string(),
            email: "alice@example.com".to_string(),
        };

        store.set_json("register.alice", &value).await.unwrap();
        let loaded: Option<Pending> = store.get_json("register.alice").await.unwrap();
        assert_eq!(loaded, Some(value));

        let raw = store.get("register.alice").await.unwrap().unwrap();
        assert!(raw.contains("\"otp\":\"123456\""));
    }

    #[tokio::test]
    async fn test_undecodable_entry_reads_as_missing() {
        let store = MemoryStore::new(DEFAULT_TTL);
        store.set("k", "not json".to_string()).await.unwrap();
        let loaded: Option<Pending> = store.get_json("k").await.unwrap();
        assert!(loaded.is_none());
    }
}
