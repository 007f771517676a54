/// Account settings: email change with verification, passwords, soft delete
use crate::directory::IdentityDirectory;
use crate::error::{IdentityError, Result};
use crate::models::{SetPasswordInput, UpdatePasswordInput, User};
use crate::security::{hash_password, verify_password};
use crate::services::notification::Localizer;
use crate::services::verification::{EmailPayload, VerificationService, EMAIL_VERIFY};
use crate::validators::{mask_email, normalize_email, validate_email};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn IdentityDirectory>,
    verification: Arc<VerificationService>,
}

impl AccountService {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        verification: Arc<VerificationService>,
    ) -> Self {
        Self {
            directory,
            verification,
        }
    }

    async fn load(&self, user_id: Uuid) -> Result<User> {
        self.directory
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)
    }

    /// Switch the account to `new_email` and send a code to confirm it
    ///
    /// The address is stored immediately with `is_email_verified = false`;
    /// [`Self::verify_email`] flips the flag back. Submitting the current
    /// address returns the account untouched and sends nothing.
    pub async fn update_email(
        &self,
        user_id: Uuid,
        new_email: &str,
        localizer: Option<&dyn Localizer>,
    ) -> Result<User> {
        let email = normalize_email(new_email);
        if !validate_email(&email) {
            return Err(IdentityError::Validation("invalid email address".to_string()));
        }

        let mut user = self.load(user_id).await?;

        if user.email.eq_ignore_ascii_case(&email) {
            return Ok(user);
        }

        if self.directory.exists_by_email(&email).await? {
            return Err(IdentityError::DuplicateEmail);
        }

        self.verification
            .initiate(
                &EMAIL_VERIFY,
                &email,
                EmailPayload {
                    email: email.clone(),
                },
                &email,
                localizer,
            )
            .await?;

        user.email = email;
        user.is_email_verified = false;
        let user = self.directory.update(&user).await?;

        info!(
            user_id = %user.id,
            email = %mask_email(&user.email),
            "Email changed, pending verification"
        );
        Ok(user)
    }

    /// Confirm the account's current email with the code sent by
    /// [`Self::update_email`]
    pub async fn verify_email(&self, user_id: Uuid, otp: &str, email: &str) -> Result<User> {
        let email = normalize_email(email);

        let user = self
            .verification
            .confirm_and_commit(
                &EMAIL_VERIFY,
                &email,
                otp,
                Some(&email),
                |payload: EmailPayload| async move {
                    let mut user = self
                        .directory
                        .find_by_id(user_id)
                        .await?
                        .ok_or(IdentityError::UserNotFound)?;

                    // The code only proves the address the account holds now
                    if !user.email.eq_ignore_ascii_case(&payload.email) {
                        return Err(IdentityError::InvalidOrExpiredCode);
                    }

                    user.is_email_verified = true;
                    Ok(self.directory.update(&user).await?)
                },
            )
            .await?;

        info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Replace a generated password with one chosen by the user
    pub async fn set_password(&self, user_id: Uuid, input: SetPasswordInput) -> Result<()> {
        input.validate()?;
        let mut user = self.load(user_id).await?;

        if !user.is_password_temp {
            warn!(user_id = %user_id, "Set password rejected: password already set");
            return Err(IdentityError::PasswordAlreadySet);
        }

        user.password_hash = hash_password(&input.password).await?;
        user.is_password_temp = false;
        self.directory.update(&user).await?;

        info!(user_id = %user_id, "Password set");
        Ok(())
    }

    pub async fn update_password(&self, user_id: Uuid, input: UpdatePasswordInput) -> Result<()> {
        input.validate()?;
        let mut user = self.load(user_id).await?;

        if !verify_password(&input.old_password, &user.password_hash).await? {
            warn!(user_id = %user_id, "Update password rejected: old password mismatch");
            return Err(IdentityError::IncorrectOldPassword);
        }

        user.password_hash = hash_password(&input.new_password).await?;
        user.is_password_temp = false;
        self.directory.update(&user).await?;

        info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    /// Soft delete; the cleanup job purges the account after the retention window
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        let mut user = self.load(user_id).await?;
        if user.is_deleted() {
            return Err(IdentityError::UserAlreadyDeleted);
        }

        user.deleted_at = Some(Utc::now());
        self.directory.update(&user).await?;

        info!(user_id = %user_id, "Account deleted");
        Ok(())
    }

    pub async fn restore_account(&self, user_id: Uuid) -> Result<User> {
        let mut user = self.load(user_id).await?;
        if !user.is_deleted() {
            return Err(IdentityError::UserNotDeleted);
        }

        user.deleted_at = None;
        let user = self.directory.update(&user).await?;

        info!(user_id = %user_id, "Account restored");
        Ok(user)
    }
}
