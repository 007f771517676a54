/// Identity Service Main Entry Point
///
/// Wires the identity core:
/// - Ephemeral state store (in-memory or Redis)
/// - JWT issuer / validator (HS256)
/// - Notifier (SMTP, no-op SMTP, or log-only)
/// - Cleanup jobs (background tasks)
///
/// Transport adapters receive the built `AuthService` / `AccountService`.
use anyhow::{Context, Result};
use identity_service::{
    config::{CacheBackend, Settings},
    directory::{IdentityDirectory, InMemoryDirectory},
    jobs::spawn_cleanup_jobs,
    security::{RevocationStore, TokenIssuer, TokenValidator},
    services::{build_notifier, AccountService, AuthService, VerificationService},
};
use redis_utils::RedisPool;
use session_cache::{MemoryStore, RedisStore, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "identity_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Identity Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize ephemeral state store
    let default_ttl = Duration::from_secs(settings.cache.default_ttl);
    let store: Arc<dyn StateStore> = match settings.cache.backend {
        CacheBackend::Memory => {
            info!("Using in-process state store");
            Arc::new(MemoryStore::new(default_ttl))
        }
        CacheBackend::Redis => {
            let url = settings
                .cache
                .redis_url
                .as_deref()
                .context("REDIS_URL must be set when CACHE_BACKEND=redis")?;
            let redis_pool = RedisPool::connect(
                url,
                Duration::from_secs(settings.cache.redis_connection_timeout),
            )
            .await
            .context("Failed to connect to Redis")?;
            info!("Redis connection manager initialized");

            Arc::new(RedisStore::new(
                redis_pool.manager(),
                default_ttl,
                Duration::from_secs(settings.cache.redis_response_timeout),
            ))
        }
    };

    // Initialize JWT issuer and validator
    let jwt_config = settings.jwt.to_jwt_config();
    let issuer = TokenIssuer::new(&jwt_config).context("Failed to initialize JWT issuer")?;
    let validator =
        TokenValidator::new(&jwt_config).context("Failed to initialize JWT validator")?;
    info!(issuer = %jwt_config.issuer, "JWT keys initialized");

    // Initialize notifier (SMTP, or log-only with NOTIFIER=log)
    let notifier = build_notifier(&settings.email).context("Failed to initialize notifier")?;

    let directory: Arc<dyn IdentityDirectory> = Arc::new(InMemoryDirectory::new());
    let revocations = RevocationStore::new(store.clone());
    let verification = Arc::new(VerificationService::new(
        store,
        notifier,
        settings.otp.length,
        settings.otp.ttl(),
    ));

    let _auth = AuthService::new(
        directory.clone(),
        issuer,
        validator,
        revocations.clone(),
        verification.clone(),
    );
    let _accounts = AccountService::new(directory.clone(), verification);

    // Spawn cleanup jobs (background tasks)
    let jobs = spawn_cleanup_jobs(revocations, directory, &settings.jobs);

    info!("Identity core ready");
    shutdown_signal().await?;

    jobs.abort();
    info!("Identity service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            res = signal::ctrl_c() => {
                res.context("Failed to install Ctrl+C handler")?;
                info!("Received Ctrl+C signal");
            },
            _ = terminate.recv() => {
                info!("Received SIGTERM signal");
            },
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("Failed to install Ctrl+C handler")?;
        info!("Received Ctrl+C signal");
    }

    info!("Shutting down gracefully...");
    Ok(())
}
