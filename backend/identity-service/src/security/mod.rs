/// Security module for authentication
///
/// Provides core security primitives for identity-service:
/// - Password hashing and verification (Argon2id)
/// - JWT token pair issuance and validation (HS256 via crypto-core)
/// - One-time codes for verification workflows
/// - Token revocation (deny-list on the ephemeral state store)
// Re-export JWT functionality from shared crypto-core library
pub use crypto_core::jwt;
pub use crypto_core::{AccessClaims, RefreshClaims, TokenIssuer, TokenPair, TokenValidator};

pub mod otp;
pub mod password;
pub mod token_revocation;

pub use otp::generate_otp;
pub use password::{hash_password, verify_password};
pub use token_revocation::RevocationStore;
