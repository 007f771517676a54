/// Identity Service Library
///
/// Token issuance and validation, logout revocation and OTP-gated account
/// workflows for the Nova backend.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `directory`: Identity directory seam and in-memory implementation
/// - `error`: Error types
/// - `jobs`: Periodic cleanup tasks
/// - `models`: Data models
/// - `security`: JWT, password hashing, one-time codes, token revocation
/// - `services`: Business logic (auth, account, verification, notification)
/// - `validators`: Input validation
pub mod config;
pub mod directory;
pub mod error;
pub mod jobs;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use error::{ErrorKind, IdentityError, Result};
pub use services::{AccountService, AuthService};
