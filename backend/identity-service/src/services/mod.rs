/// Service layer for identity-service
///
/// - Authentication: login, refresh, logout, registration, password recovery,
///   social login
/// - Account: email change with verification
/// - Verification: generic OTP two-phase workflow
/// - Notification: delivery seam (SMTP or log)
pub mod account;
pub mod auth;
pub mod email;
pub mod notification;
pub mod verification;

pub use account::AccountService;
pub use auth::{AuthService, PendingRegistration};
pub use email::{build_notifier, SmtpNotifier};
pub use notification::{
    Localizer, LogNotifier, Notification, NotificationArgs, Notifier, NotifyError,
};
pub use verification::{
    EmailPayload, PendingVerification, VerificationPayload, VerificationService, Workflow,
    EMAIL_VERIFY, RECOVERY_PASSWORD, REGISTER,
};
