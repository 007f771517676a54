use super::{DirectoryError, DirectoryResult, IdentityDirectory};
use crate::models::{NewUser, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Process-local directory for single-instance deployments and tests.
///
/// Emails compare case-insensitively, usernames exactly. The first user ever
/// created becomes `admin`.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn email_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn conflicts(users: &HashMap<Uuid, User>, id: Uuid, username: &str, email: &str) -> bool {
    users
        .values()
        .any(|u| u.id != id && (u.username == username || email_eq(&u.email, email)))
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: Uuid) -> DirectoryResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> DirectoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == login || email_eq(&u.email, login))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| email_eq(&u.email, email)).cloned())
    }

    async fn exists_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> DirectoryResult<bool> {
        let users = self.users.read().await;
        Ok(conflicts(&users, Uuid::nil(), username, email))
    }

    async fn exists_by_username(&self, username: &str) -> DirectoryResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> DirectoryResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| email_eq(&u.email, email)))
    }

    async fn create(&self, new_user: NewUser) -> DirectoryResult<User> {
        let mut users = self.users.write().await;
        if conflicts(&users, Uuid::nil(), &new_user.username, &new_user.email) {
            return Err(DirectoryError::Duplicate);
        }

        let role = if users.is_empty() { Role::Admin } else { Role::User };
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role,
            is_enabled: new_user.is_enabled,
            is_email_verified: new_user.is_email_verified,
            is_password_temp: new_user.is_password_temp,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> DirectoryResult<User> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(DirectoryError::Backend(format!("user {} not found", user.id)));
        }
        if conflicts(&users, user.id, &user.username, &user.email) {
            return Err(DirectoryError::Duplicate);
        }

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        users.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn purge_deleted_before(&self, cutoff: DateTime<Utc>) -> DirectoryResult<u64> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|_, u| !matches!(u.deleted_at, Some(at) if at < cutoff));
        let purged = (before - users.len()) as u64;

        if purged > 0 {
            info!(purged, "Purged soft-deleted users");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            is_enabled: true,
            is_email_verified: true,
            is_password_temp: false,
        }
    }

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let dir = InMemoryDirectory::new();
        let first = dir.create(new_user("alice", "alice@example.com")).await.unwrap();
        let second = dir.create(new_user("bob", "bob@example.com")).await.unwrap();

        assert_eq!(first.role, Role::Admin);
        assert_eq!(second.role, Role::User);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let dir = InMemoryDirectory::new();
        dir.create(new_user("alice", "alice@example.com")).await.unwrap();

        let same_name = dir.create(new_user("alice", "other@example.com")).await;
        assert!(matches!(same_name, Err(DirectoryError::Duplicate)));

        let same_email = dir.create(new_user("other", "ALICE@example.com")).await;
        assert!(matches!(same_email, Err(DirectoryError::Duplicate)));
    }

    #[tokio::test]
    async fn test_find_by_login_matches_username_or_email() {
        let dir = InMemoryDirectory::new();
        let alice = dir.create(new_user("alice", "alice@example.com")).await.unwrap();

        let by_name = dir.find_by_login("alice").await.unwrap().unwrap();
        let by_email = dir.find_by_login("Alice@Example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);
        assert_eq!(by_email.id, alice.id);
        assert!(dir.find_by_login("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email() {
        let dir = InMemoryDirectory::new();
        dir.create(new_user("alice", "alice@example.com")).await.unwrap();
        let mut bob = dir.create(new_user("bob", "bob@example.com")).await.unwrap();

        bob.email = "alice@example.com".to_string();
        assert!(matches!(dir.update(&bob).await, Err(DirectoryError::Duplicate)));
    }

    #[tokio::test]
    async fn test_purge_deleted_before_cutoff() {
        let dir = InMemoryDirectory::new();
        let mut old = dir.create(new_user("old", "old@example.com")).await.unwrap();
        let mut recent = dir.create(new_user("recent", "recent@example.com")).await.unwrap();
        dir.create(new_user("active", "active@example.com")).await.unwrap();

        old.deleted_at = Some(Utc::now() - Duration::days(40));
        recent.deleted_at = Some(Utc::now() - Duration::days(1));
        dir.update(&old).await.unwrap();
        dir.update(&recent).await.unwrap();

        let purged = dir
            .purge_deleted_before(Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(dir.len().await, 2);
        assert!(dir.find_by_id(old.id).await.unwrap().is_none());
    }
}
