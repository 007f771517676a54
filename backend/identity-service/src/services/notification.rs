/// Outbound notification seam
///
/// Verification workflows render a [`Notification`] and hand it to a
/// [`Notifier`]. Delivery mechanics live behind the trait: [`LogNotifier`] for
/// development and `SmtpNotifier` for real mail.
use crate::validators::mask_email;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Values substituted into templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationArgs {
    pub email: String,
    pub otp: String,
    pub ttl_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Template name, e.g. `register-confirm`
    pub template: String,
    pub recipient: String,
    /// Localized subject line
    pub title: String,
    pub args: NotificationArgs,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Best-effort message catalog lookup
pub trait Localizer: Send + Sync {
    /// Localized text for `key`, `None` when the catalog has no entry
    fn localize(&self, key: &str) -> Option<String>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            template = %notification.template,
            recipient = %mask_email(&notification.recipient),
            title = %notification.title,
            "Notification logged (no delivery transport configured)"
        );
        debug!(otp = %notification.args.otp, "Notification code");
        Ok(())
    }
}
