/// Authentication Service
///
/// Orchestrates credentials, token pairs, revocation and the registration and
/// password-recovery workflows.
///
/// Two resources take part and can fail independently: the identity
/// directory (durable) and the ephemeral state store (pending codes, deny-list).
/// No operation spans both in a transaction. Directory writes happen first and
/// the pending entry is consumed afterwards on a best-effort basis.
use crate::directory::IdentityDirectory;
use crate::error::{IdentityError, Result};
use crate::models::{NewUser, RegisterInput, SocialUserInfo, User};
use crate::security::{
    hash_password, verify_password, AccessClaims, RevocationStore, TokenIssuer, TokenPair,
    TokenValidator,
};
use crate::services::notification::Localizer;
use crate::services::verification::{
    EmailPayload, VerificationPayload, VerificationService, RECOVERY_PASSWORD, REGISTER,
};
use crate::validators::{mask_email, normalize_email, sanitize_username};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts at a random `<base>_<6 digits>` username before giving up
const USERNAME_SUFFIX_ATTEMPTS: usize = 16;

/// Length of the throwaway password given to social-login accounts
const TEMP_PASSWORD_LENGTH: usize = 32;

const MIN_PASSWORD_CHARS: usize = 8;

/// Draft user held by the `register` workflow until confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl VerificationPayload for PendingRegistration {
    fn correlation(&self) -> &str {
        &self.email
    }
}

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn IdentityDirectory>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    revocations: RevocationStore,
    verification: Arc<VerificationService>,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        issuer: TokenIssuer,
        validator: TokenValidator,
        revocations: RevocationStore,
        verification: Arc<VerificationService>,
    ) -> Self {
        Self {
            directory,
            issuer,
            validator,
            revocations,
            verification,
        }
    }

    /// Authenticate by username or email and password
    pub async fn login(&self, login: &str, password: &str) -> Result<TokenPair> {
        let user = self
            .directory
            .find_by_login(login.trim())
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login failed: bad credentials");
            return Err(IdentityError::BadCredentials);
        }

        if !user.is_enabled {
            warn!(user_id = %user.id, "Login rejected: user is blocked");
            return Err(IdentityError::UserIsBlocked);
        }

        let pair = self.issuer.issue_pair(&user.to_token_subject())?;
        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The user is re-read from the directory since refresh tokens carry no
    /// snapshot. The old `jti` stays valid until it expires or is logged out.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.validator.validate_refresh(refresh_token)?;

        if self.revocations.is_revoked(&claims.jti).await? {
            warn!(user_id = %claims.sub, "Refresh rejected: token revoked");
            return Err(IdentityError::TokenRevoked);
        }

        let user = self
            .directory
            .find_by_id(claims.sub)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if !user.is_enabled {
            return Err(IdentityError::UserIsBlocked);
        }

        self.issuer
            .issue_pair(&user.to_token_subject())
            .map_err(Into::into)
    }

    /// Revoke a token pair by its shared `jti` for the refresh-token lifetime
    pub async fn logout(&self, jti: &str) -> Result<()> {
        self.revocations
            .revoke(jti, self.issuer.refresh_ttl())
            .await?;
        info!(jti = %jti, "User logged out");
        Ok(())
    }

    /// Guard for protected operations: a valid, unrevoked access token of an
    /// enabled user
    pub async fn authenticate(&self, access_token: &str) -> Result<AccessClaims> {
        let claims = self.validator.validate_access(access_token)?;

        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(IdentityError::TokenRevoked);
        }

        if !claims.enabled {
            return Err(IdentityError::UserIsBlocked);
        }

        Ok(claims)
    }

    /// Start registration; the account is created by [`Self::register_confirm`]
    pub async fn register(
        &self,
        input: RegisterInput,
        localizer: Option<&dyn Localizer>,
    ) -> Result<()> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if self
            .directory
            .exists_by_username_or_email(&input.username, &email)
            .await?
        {
            return Err(IdentityError::DuplicateUser);
        }

        let password_hash = hash_password(&input.password).await?;
        let draft = PendingRegistration {
            username: input.username,
            email: email.clone(),
            password_hash,
        };

        self.verification
            .initiate(&REGISTER, &email, draft, &email, localizer)
            .await?;

        info!(email = %mask_email(&email), "Registration pending confirmation");
        Ok(())
    }

    /// Finish registration and create the user
    pub async fn register_confirm(&self, otp: &str, email: &str) -> Result<User> {
        let email = normalize_email(email);

        let user = self
            .verification
            .confirm_and_commit(
                &REGISTER,
                &email,
                otp,
                Some(&email),
                |draft: PendingRegistration| async move {
                    // Someone may have taken the name or address since initiation
                    if self
                        .directory
                        .exists_by_username_or_email(&draft.username, &draft.email)
                        .await?
                    {
                        return Err(IdentityError::DuplicateUser);
                    }

                    let user = self
                        .directory
                        .create(NewUser {
                            username: draft.username,
                            email: draft.email,
                            password_hash: draft.password_hash,
                            is_enabled: true,
                            is_email_verified: true,
                            is_password_temp: false,
                        })
                        .await?;
                    Ok(user)
                },
            )
            .await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Send a password recovery code to an existing account
    pub async fn recovery_password(
        &self,
        email: &str,
        localizer: Option<&dyn Localizer>,
    ) -> Result<()> {
        let email = normalize_email(email);
        self.directory
            .find_by_email(&email)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        self.verification
            .initiate(
                &RECOVERY_PASSWORD,
                &email,
                EmailPayload {
                    email: email.clone(),
                },
                &email,
                localizer,
            )
            .await
    }

    /// Check a recovery code without using it up
    pub async fn verify_recovery_code(&self, otp: &str, email: &str) -> Result<()> {
        let email = normalize_email(email);
        self.verification
            .confirm::<EmailPayload>(&RECOVERY_PASSWORD, &email, otp, Some(&email))
            .await?;
        Ok(())
    }

    /// Set a new password with a recovery code; the code is consumed on success
    pub async fn reset_password(&self, otp: &str, email: &str, new_password: &str) -> Result<()> {
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(IdentityError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        let email = normalize_email(email);

        let user_id = self
            .verification
            .confirm_and_commit(
                &RECOVERY_PASSWORD,
                &email,
                otp,
                Some(&email),
                |payload: EmailPayload| async move {
                    let mut user = self
                        .directory
                        .find_by_email(&payload.email)
                        .await?
                        .ok_or(IdentityError::UserNotFound)?;

                    user.password_hash = hash_password(new_password).await?;
                    user.is_password_temp = false;
                    let user = self.directory.update(&user).await?;
                    Ok(user.id)
                },
            )
            .await?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    /// Complete an external-provider login, creating the account on first use
    pub async fn social_login(&self, social: SocialUserInfo) -> Result<TokenPair> {
        let email = normalize_email(&social.email);

        let user = match self.directory.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let base = if social.username.trim().is_empty() {
                    email.split('@').next().unwrap_or_default().to_string()
                } else {
                    social.username
                };
                let username = self.unique_username(&base).await?;
                let password_hash = hash_password(&temp_password()).await?;

                let user = self
                    .directory
                    .create(NewUser {
                        username,
                        email,
                        password_hash,
                        is_enabled: true,
                        is_email_verified: true,
                        is_password_temp: true,
                    })
                    .await?;
                info!(user_id = %user.id, "User created via social login");
                user
            }
        };

        if !user.is_enabled {
            return Err(IdentityError::UserIsBlocked);
        }

        let pair = self.issuer.issue_pair(&user.to_token_subject())?;
        info!(user_id = %user.id, "User logged in via social provider");
        Ok(pair)
    }

    /// `base` if free, otherwise `base_<6 random digits>`
    async fn unique_username(&self, raw: &str) -> Result<String> {
        let base = sanitize_username(raw);
        if !self.directory.exists_by_username(&base).await? {
            return Ok(base);
        }

        for _ in 0..USERNAME_SUFFIX_ATTEMPTS {
            let candidate = format!("{}_{:06}", base, OsRng.gen_range(0..1_000_000u32));
            if !self.directory.exists_by_username(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(IdentityError::Internal(format!(
            "no free username derived from {}",
            base
        )))
    }

    pub async fn find_user(&self, id: Uuid) -> Result<User> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::UserNotFound)
    }
}

fn temp_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}
