/// OTP-gated two-phase verification
///
/// Registration, email change and password recovery all follow the same
/// pattern: `initiate` stores a pending entry and sends a code out of band,
/// `confirm` checks the code, and the caller commits its business effect.
///
/// ## State per correlation key
///
/// ```text
/// absent --initiate--> pending --commit ok--> absent
/// pending --initiate--> pending (new code, old code dead)
/// pending --confirm fails--> pending
/// pending --TTL--> absent
/// ```
///
/// Re-initiation overwrites without compare-and-set; concurrent initiations
/// resolve to last write wins.
use crate::error::{IdentityError, Result};
use crate::security::generate_otp;
use crate::services::notification::{Localizer, Notification, NotificationArgs, Notifier};
use crate::validators::mask_email;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use session_cache::{cache_key, StateStore, StateStoreExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Static description of one verification use case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workflow {
    /// Key namespace, e.g. `register`
    pub name: &'static str,
    pub template: &'static str,
    /// Localization key of the notification title
    pub title_key: &'static str,
    /// Title used when no localizer is supplied or it has no entry
    pub default_title: &'static str,
}

pub const REGISTER: Workflow = Workflow {
    name: "register",
    template: "register-confirm",
    title_key: "register_confirm_title",
    default_title: "Activate your account",
};

pub const EMAIL_VERIFY: Workflow = Workflow {
    name: "email-verify",
    template: "email-verify",
    title_key: "email_verify_title",
    default_title: "Verify email",
};

pub const RECOVERY_PASSWORD: Workflow = Workflow {
    name: "recovery_password",
    template: "recovery-password",
    title_key: "recovery_password_title",
    default_title: "Recovery password",
};

/// Workflow payload stored alongside the code
pub trait VerificationPayload: Serialize + DeserializeOwned + Send + Sync {
    /// Value a caller may be asked to repeat at confirmation (usually the email)
    fn correlation(&self) -> &str;
}

/// Payload carrying only the address being verified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub email: String,
}

impl VerificationPayload for EmailPayload {
    fn correlation(&self) -> &str {
        &self.email
    }
}

/// Cached entry under `<workflow>.<key>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVerification<P> {
    pub otp: String,
    pub payload: P,
    pub expires_at: DateTime<Utc>,
}

pub struct VerificationService {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    otp_length: i32,
    ttl: Duration,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        otp_length: i32,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            otp_length,
            ttl,
        }
    }

    /// Store a fresh pending entry and send its code to `recipient`
    ///
    /// Any previous entry for the same key is replaced. If delivery fails the
    /// call returns `SendFailed` and the new entry stays cached; callers retry
    /// by initiating again.
    pub async fn initiate<P: VerificationPayload>(
        &self,
        workflow: &Workflow,
        key: &str,
        payload: P,
        recipient: &str,
        localizer: Option<&dyn Localizer>,
    ) -> Result<()> {
        let otp = generate_otp(self.otp_length)?;
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| IdentityError::Internal(format!("Invalid verification TTL: {}", e)))?;

        let pending = PendingVerification {
            otp: otp.clone(),
            payload,
            expires_at: Utc::now() + ttl,
        };

        self.store
            .set_json_with_expiration(&cache_key(workflow.name, key), &pending, self.ttl)
            .await?;

        let title = localizer
            .and_then(|l| l.localize(workflow.title_key))
            .unwrap_or_else(|| workflow.default_title.to_string());

        let notification = Notification {
            template: workflow.template.to_string(),
            recipient: recipient.to_string(),
            title,
            args: NotificationArgs {
                email: recipient.to_string(),
                otp,
                ttl_minutes: self.ttl.as_secs() / 60,
            },
        };

        self.notifier.send(&notification).await?;

        info!(
            workflow = workflow.name,
            recipient = %mask_email(recipient),
            "Verification initiated"
        );
        Ok(())
    }

    /// Check `otp` against the pending entry and return its payload
    ///
    /// Missing entry, expired entry, wrong code and a `secondary` value that
    /// differs from the payload all fail with the same `InvalidOrExpiredCode`.
    /// The entry is left in place.
    pub async fn confirm<P: VerificationPayload>(
        &self,
        workflow: &Workflow,
        key: &str,
        otp: &str,
        secondary: Option<&str>,
    ) -> Result<P> {
        let pending: Option<PendingVerification<P>> =
            self.store.get_json(&cache_key(workflow.name, key)).await?;

        let Some(pending) = pending else {
            debug!(workflow = workflow.name, "No pending verification");
            return Err(IdentityError::InvalidOrExpiredCode);
        };

        if pending.expires_at <= Utc::now() {
            debug!(workflow = workflow.name, "Pending verification expired");
            return Err(IdentityError::InvalidOrExpiredCode);
        }

        if pending.otp != otp {
            debug!(workflow = workflow.name, "Verification code mismatch");
            return Err(IdentityError::InvalidOrExpiredCode);
        }

        if let Some(expected) = secondary {
            if !pending.payload.correlation().eq_ignore_ascii_case(expected) {
                debug!(workflow = workflow.name, "Verification correlation mismatch");
                return Err(IdentityError::InvalidOrExpiredCode);
            }
        }

        Ok(pending.payload)
    }

    /// Delete the pending entry. Failures are logged only; the TTL reclaims it.
    pub async fn consume(&self, workflow: &Workflow, key: &str) {
        let cache_key = cache_key(workflow.name, key);
        if let Err(e) = self.store.delete(&[cache_key.as_str()]).await {
            warn!(
                workflow = workflow.name,
                error = %e,
                "Failed to delete pending verification"
            );
        }
    }

    /// Confirm, run `commit` with the payload, then consume the entry
    ///
    /// The entry is only consumed when `commit` succeeds, so a failed commit
    /// can be retried with the same code.
    pub async fn confirm_and_commit<P, T, F, Fut>(
        &self,
        workflow: &Workflow,
        key: &str,
        otp: &str,
        secondary: Option<&str>,
        commit: F,
    ) -> Result<T>
    where
        P: VerificationPayload,
        F: FnOnce(P) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let payload = self.confirm::<P>(workflow, key, otp, secondary).await?;
        let committed = commit(payload).await?;
        self.consume(workflow, key).await;
        Ok(committed)
    }
}
