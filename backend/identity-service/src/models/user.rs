use crate::validators::validate_username_shape_validator;
use chrono::{DateTime, Utc};
use crypto_core::TokenSubject;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// User model - core identity entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_enabled: bool,
    pub is_email_verified: bool,
    /// Set for accounts created through social login until the user picks a password
    pub is_password_temp: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Snapshot embedded into access tokens
    pub fn to_token_subject(&self) -> TokenSubject {
        TokenSubject {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.as_str().to_string(),
            enabled: self.is_enabled,
            deleted: self.is_deleted(),
        }
    }
}

/// Fields supplied when creating a user; the directory assigns id, role and timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_enabled: bool,
    pub is_email_verified: bool,
    pub is_password_temp: bool,
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(custom(function = "validate_username_shape_validator"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// First password for an account that only has a generated one
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPasswordInput {
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordInput {
    pub old_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Identity asserted by an external provider after a successful OAuth exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialUserInfo {
    pub email: String,
    /// Preferred username, usually derived from the provider profile
    pub username: String,
}
