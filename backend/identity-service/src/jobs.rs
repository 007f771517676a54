/// Periodic cleanup jobs
///
/// - Revocation sweep: drops expired deny-list entries on backends without
///   native key expiry
/// - Deleted-user purge: hard-deletes users soft-deleted longer than the
///   retention window
///
/// Each job runs in its own task. Failures are logged and the loop continues.
use crate::config::JobSettings;
use crate::directory::IdentityDirectory;
use crate::security::RevocationStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

pub struct CleanupHandles {
    pub revocation_sweep: JoinHandle<()>,
    pub deleted_user_purge: JoinHandle<()>,
}

impl CleanupHandles {
    pub fn abort(&self) {
        self.revocation_sweep.abort();
        self.deleted_user_purge.abort();
    }
}

pub fn spawn_cleanup_jobs(
    revocations: RevocationStore,
    directory: Arc<dyn IdentityDirectory>,
    settings: &JobSettings,
) -> CleanupHandles {
    info!(
        revocation_sweep_secs = settings.revocation_sweep_interval,
        deleted_user_sweep_secs = settings.deleted_user_sweep_interval,
        retention_days = settings.deleted_user_retention_days,
        "Starting identity-service cleanup jobs"
    );

    CleanupHandles {
        revocation_sweep: spawn_revocation_sweep(
            revocations,
            Duration::from_secs(settings.revocation_sweep_interval),
        ),
        deleted_user_purge: spawn_deleted_user_purge(
            directory,
            Duration::from_secs(settings.deleted_user_sweep_interval),
            chrono::Duration::days(settings.deleted_user_retention_days),
        ),
    }
}

fn spawn_revocation_sweep(revocations: RevocationStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match revocations.purge_expired().await {
                Ok(purged) => debug!(purged, "Revocation sweep finished"),
                Err(err) => error!("Revocation sweep failed: {}", err),
            }
        }
    })
}

fn spawn_deleted_user_purge(
    directory: Arc<dyn IdentityDirectory>,
    interval: Duration,
    retention: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let cutoff = Utc::now() - retention;
            match directory.purge_deleted_before(cutoff).await {
                Ok(purged) => debug!(purged, "Deleted-user purge finished"),
                Err(err) => error!("Deleted-user purge failed: {}", err),
            }
        }
    })
}
