//! Redis backend

use crate::keys::escape_glob;
use crate::{CacheResult, StateStore, MAX_TTL};
use async_trait::async_trait;
use redis::Pipeline;
use redis_utils::{with_timeout, SharedConnectionManager};
use std::time::Duration;
use tracing::debug;

/// Keys requested per SCAN round-trip during invalidation
const SCAN_BATCH: usize = 100;

/// Redis-backed store using native per-key expiry
#[derive(Clone)]
pub struct RedisStore {
    redis: SharedConnectionManager,
    default_ttl: Duration,
    command_timeout: Duration,
}

impl RedisStore {
    pub fn new(
        redis: SharedConnectionManager,
        default_ttl: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            redis,
            default_ttl,
            command_timeout,
        }
    }

    async fn write(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(px_millis(ttl));
        }

        let mut conn = self.redis.lock().await.clone();
        with_timeout(self.command_timeout, cmd.query_async::<_, ()>(&mut conn)).await?;

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        Ok(())
    }
}

/// Sub-millisecond TTLs still get one millisecond
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.min(MAX_TTL).as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.redis.lock().await.clone();
        let value: Option<String> = with_timeout(
            self.command_timeout,
            redis::cmd("GET").arg(key).query_async(&mut conn),
        )
        .await?;

        debug!(key = %key, hit = value.is_some(), "Cache get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> CacheResult<()> {
        self.write(key, value, self.default_ttl).await
    }

    async fn set_with_expiration(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> CacheResult<()> {
        self.write(key, value, ttl).await
    }

    async fn delete(&self, keys: &[&str]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.lock().await.clone();
        with_timeout(
            self.command_timeout,
            redis::cmd("DEL").arg(keys).query_async::<_, ()>(&mut conn),
        )
        .await?;

        debug!(count = keys.len(), "Cache delete");
        Ok(())
    }

    async fn invalidate(&self, prefix: &str) -> CacheResult<usize> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.redis.lock().await.clone();
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            // SCAN instead of KEYS to avoid blocking the shared server
            let (next_cursor, keys): (u64, Vec<String>) = with_timeout(
                self.command_timeout,
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn),
            )
            .await?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.cmd("DEL").arg(key);
                }
                let deleted: Vec<usize> =
                    with_timeout(self.command_timeout, pipe.query_async(&mut conn)).await?;
                total_deleted += deleted.iter().sum::<usize>();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(prefix = %prefix, deleted = total_deleted, "Cache scan delete");
        Ok(total_deleted)
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        // Redis expires keys natively
        Ok(0)
    }
}
