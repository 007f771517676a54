use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionInfo, IntoConnectionInfo, RedisError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{info, warn};

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Redis connection pool backed by a single reconnecting connection manager.
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    /// Connect and verify the server answers `PING` within `connect_timeout`.
    pub async fn connect(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let db = info.redis.db;

        let client = Client::open(info).context("failed to construct Redis client")?;
        let mut connection_manager = tokio::time::timeout(
            connect_timeout,
            ConnectionManager::new(client),
        )
        .await
        .context("timed out connecting to Redis")?
        .context("failed to initialize Redis connection manager")?;

        let pong: String = with_timeout(
            connect_timeout,
            redis::cmd("PING").query_async(&mut connection_manager),
        )
        .await
        .context("Redis health check failed")?;

        if pong != "PONG" {
            warn!(response = %pong, "Unexpected Redis PING response");
        }

        info!(db, "Redis connection established");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}

/// Bound a Redis round-trip. An elapsed deadline surfaces as an I/O `RedisError`
/// so callers handle it like any other transport failure.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T, RedisError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(RedisError::from((
            redis::ErrorKind::IoError,
            "redis command timed out",
        ))),
    }
}
