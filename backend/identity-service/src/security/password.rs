/// Password hashing and verification using Argon2id
use crate::error::{IdentityError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Inputs longer than this are rejected before hashing
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using Argon2id algorithm
///
/// ## Security
///
/// - Algorithm: Argon2id (default configuration)
/// - Salt: Random 16-byte salt generated per password
/// - Runs on the blocking pool; hashing is deliberately CPU-heavy
///
/// ## Returns
///
/// PHC-formatted hash string safe for storage
///
/// ## Errors
///
/// - `PasswordTooLong` if the password exceeds 72 bytes
/// - `Internal` if hashing fails
pub async fn hash_password(password: &str) -> Result<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(IdentityError::PasswordTooLong);
    }

    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| IdentityError::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| IdentityError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Verify a password against its hash
///
/// Uses constant-time comparison. Returns `false` on mismatch; a malformed
/// stored hash is an `Internal` error.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();

    tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| IdentityError::Internal(format!("Invalid password hash format: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(IdentityError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    })
    .await
    .map_err(|e| IdentityError::Internal(format!("Password verification task failed: {}", e)))?
}
