use crate::directory::DirectoryError;
use crate::services::notification::NotifyError;
use crypto_core::JwtError;
use session_cache::CacheError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("User already exists")]
    DuplicateUser,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Password is already set")]
    PasswordAlreadySet,

    #[error("Incorrect old password")]
    IncorrectOldPassword,

    #[error("User is already deleted")]
    UserAlreadyDeleted,

    #[error("User is not deleted")]
    UserNotDeleted,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    BadCredentials,

    #[error("User is blocked")]
    UserIsBlocked,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid OTP length: {0}")]
    InvalidOtpLength(i32),

    #[error("Password exceeds 72 bytes")]
    PasswordTooLong,

    #[error("Failed to send notification: {0}")]
    SendFailed(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Stable classification for transport adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidToken,
    Revoked,
    InvalidOrExpiredCode,
    Conflict,
    NotFound,
    Unauthorized,
    InvalidInput,
    DependencyFailure,
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidToken => ErrorKind::InvalidToken,
            IdentityError::TokenRevoked => ErrorKind::Revoked,
            IdentityError::InvalidOrExpiredCode => ErrorKind::InvalidOrExpiredCode,
            IdentityError::DuplicateUser
            | IdentityError::DuplicateEmail
            | IdentityError::PasswordAlreadySet
            | IdentityError::UserAlreadyDeleted
            | IdentityError::UserNotDeleted => ErrorKind::Conflict,
            IdentityError::UserNotFound => ErrorKind::NotFound,
            IdentityError::BadCredentials
            | IdentityError::UserIsBlocked
            | IdentityError::IncorrectOldPassword => ErrorKind::Unauthorized,
            IdentityError::Validation(_) | IdentityError::InvalidOtpLength(_) => {
                ErrorKind::InvalidInput
            }
            IdentityError::PasswordTooLong
            | IdentityError::SendFailed(_)
            | IdentityError::Cache(_)
            | IdentityError::Directory(_)
            | IdentityError::Jwt(_)
            | IdentityError::Internal(_) => ErrorKind::DependencyFailure,
        }
    }
}

// Conversions from external error types
impl From<CacheError> for IdentityError {
    fn from(err: CacheError) -> Self {
        tracing::error!("Cache error: {}", err);
        IdentityError::Cache(err.to_string())
    }
}

impl From<DirectoryError> for IdentityError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Duplicate => IdentityError::DuplicateUser,
            DirectoryError::Backend(msg) => {
                tracing::error!("Directory error: {}", msg);
                IdentityError::Directory(msg)
            }
        }
    }
}

impl From<JwtError> for IdentityError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken => IdentityError::InvalidToken,
            other => {
                tracing::error!("JWT error: {}", other);
                IdentityError::Jwt(other.to_string())
            }
        }
    }
}

impl From<NotifyError> for IdentityError {
    fn from(err: NotifyError) -> Self {
        tracing::error!("Notification error: {}", err);
        IdentityError::SendFailed(err.to_string())
    }
}

impl From<validator::ValidationErrors> for IdentityError {
    fn from(err: validator::ValidationErrors) -> Self {
        IdentityError::Validation(err.to_string())
    }
}
