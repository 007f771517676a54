/// JWT Token Revocation Management
///
/// Deny-list of token identifiers (`jti`) kept on the ephemeral state store.
/// Access and refresh tokens of one pair share a `jti`, so a single entry
/// blocks both.
///
/// Entries carry a TTL equal to the remaining validity of the blocked token
/// and expire on their own. Backends without native expiry are swept by the
/// cleanup job through [`RevocationStore::purge_expired`].
use crate::error::Result;
use session_cache::{cache_key, StateStore, StateStoreExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Key namespace: `revoked-token.<jti>`
pub const REVOKED_TOKEN_PREFIX: &str = "revoked-token";

#[derive(Clone)]
pub struct RevocationStore {
    store: Arc<dyn StateStore>,
}

impl RevocationStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Record `jti` as revoked for `ttl`
    ///
    /// Write failures are returned to the caller: a logout that cannot be
    /// recorded must fail. A zero TTL means the token already expired, so
    /// nothing is written.
    pub async fn revoke(&self, jti: &str, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            debug!(jti = %jti, "Skipping revocation of already expired token");
            return Ok(());
        }

        let key = cache_key(REVOKED_TOKEN_PREFIX, jti);
        self.store.set_json_with_expiration(&key, &true, ttl).await?;

        info!(
            jti = %jti,
            ttl_secs = ttl.as_secs(),
            "Token revoked, deny-list entry will expire"
        );
        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        let key = cache_key(REVOKED_TOKEN_PREFIX, jti);
        Ok(self.store.get(&key).await?.is_some())
    }

    /// Sweep expired entries; returns how many were dropped
    pub async fn purge_expired(&self) -> Result<usize> {
        Ok(self.store.purge_expired().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityError;
    use crate::test_utils::FailingStore;
    use session_cache::MemoryStore;

    fn revocations() -> (RevocationStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(300)));
        (RevocationStore::new(store.clone()), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoked_until_ttl_elapses() {
        let (revocations, _) = revocations();
        assert!(!revocations.is_revoked("jti-1").await.unwrap());

        revocations
            .revoke("jti-1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(revocations.is_revoked("jti-1").await.unwrap());
        assert!(!revocations.is_revoked("jti-2").await.unwrap());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(revocations.is_revoked("jti-1").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!revocations.is_revoked("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_key_layout() {
        let (revocations, store) = revocations();
        revocations
            .revoke("abc", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.get("revoked-token.abc").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_noop() {
        let (revocations, _) = revocations();
        revocations.revoke("jti", Duration::ZERO).await.unwrap();
        assert!(!revocations.is_revoked("jti").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_drops_stale_entries() {
        let (revocations, _) = revocations();
        revocations.revoke("a", Duration::from_secs(1)).await.unwrap();
        revocations.revoke("b", Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(revocations.purge_expired().await.unwrap(), 1);
        assert!(revocations.is_revoked("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_failure_is_surfaced() {
        let revocations = RevocationStore::new(Arc::new(FailingStore));
        let result = revocations.revoke("jti", Duration::from_secs(60)).await;
        assert!(matches!(result, Err(IdentityError::Cache(_))));
    }
}
