/// SMTP notifier for verification codes
use crate::config::{EmailSettings, NotifierBackend};
use crate::error::{IdentityError, Result};
use crate::services::notification::{
    LogNotifier, Notification, NotificationArgs, Notifier, NotifyError,
};
use crate::validators::mask_email;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build notifier from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    /// Useful for development and testing without email infrastructure.
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| IdentityError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email notifier will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| {
                IdentityError::Internal(format!("Failed to configure SMTP transport: {}", e))
            })?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    /// Check if SMTP transport is enabled
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn build_message(
        &self,
        notification: &Notification,
    ) -> std::result::Result<Message, NotifyError> {
        let (html_body, text_body) = render(&notification.template, &notification.args)?;

        let to = notification
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidRecipient(e.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.title.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> std::result::Result<(), NotifyError> {
        let email = self.build_message(notification)?;

        if let Some(transport) = &self.transport {
            transport
                .send(email)
                .await
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            info!(
                template = %notification.template,
                recipient = %mask_email(&notification.recipient),
                "Verification email sent successfully"
            );
        } else {
            info!(
                template = %notification.template,
                recipient = %mask_email(&notification.recipient),
                "Email notifier running in no-op mode; skipping actual send"
            );
        }
        Ok(())
    }
}

/// Build the notifier selected by `NOTIFIER`
pub fn build_notifier(config: &EmailSettings) -> Result<Arc<dyn Notifier>> {
    match config.notifier {
        NotifierBackend::Log => {
            info!("Notifications will be logged, not delivered");
            Ok(Arc::new(LogNotifier))
        }
        NotifierBackend::Smtp => {
            let notifier = SmtpNotifier::new(config)?;
            if notifier.is_enabled() {
                info!("Email notifier initialized with SMTP");
            } else {
                info!("Email notifier running in no-op mode (SMTP not configured)");
            }
            Ok(Arc::new(notifier))
        }
    }
}

/// Render `(html, text)` bodies for a template
fn render(
    template: &str,
    args: &NotificationArgs,
) -> std::result::Result<(String, String), NotifyError> {
    let (heading, intro) = match template {
        "register-confirm" => (
            "Activate your account",
            "Thanks for signing up. Enter this code to activate your account:",
        ),
        "email-verify" => (
            "Verify your email",
            "Enter this code to confirm your new email address:",
        ),
        "recovery-password" => (
            "Password recovery",
            "We received a request to reset your password. Enter this code to continue:",
        ),
        other => return Err(NotifyError::UnknownTemplate(other.to_string())),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>{heading}</h2>
    <p>{intro}</p>
    <p style="margin: 30px 0; font-size: 28px; letter-spacing: 6px; font-weight: bold;">{otp}</p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">
        This code will expire in {ttl} minutes.<br>
        If you did not request this, please ignore this email.
    </p>
</body>
</html>"#,
        heading = heading,
        intro = intro,
        otp = args.otp,
        ttl = args.ttl_minutes,
    );

    let text = format!(
        "{heading}\n\n{intro}\n{otp}\n\nThis code will expire in {ttl} minutes.\n\
        If you did not request this, please ignore this email.",
        heading = heading,
        intro = intro,
        otp = args.otp,
        ttl = args.ttl_minutes,
    );

    Ok((html, text))
}
