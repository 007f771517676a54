//! Identity directory seam
//!
//! The durable user store is an external collaborator. Services only depend on
//! the lookups and writes declared here.

mod memory;

pub use memory::InMemoryDirectory;

use crate::models::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Unique constraint on username or email violated
    #[error("User already exists")]
    Duplicate,

    #[error("Directory backend error: {0}")]
    Backend(String),
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DirectoryResult<Option<User>>;

    /// Lookup by username or email
    async fn find_by_login(&self, login: &str) -> DirectoryResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>>;

    async fn exists_by_username_or_email(&self, username: &str, email: &str)
        -> DirectoryResult<bool>;

    async fn exists_by_username(&self, username: &str) -> DirectoryResult<bool>;

    async fn exists_by_email(&self, email: &str) -> DirectoryResult<bool>;

    async fn create(&self, user: NewUser) -> DirectoryResult<User>;

    async fn update(&self, user: &User) -> DirectoryResult<User>;

    /// Hard-delete users soft-deleted before `cutoff`; returns how many were removed
    async fn purge_deleted_before(&self, cutoff: DateTime<Utc>) -> DirectoryResult<u64>;
}
