//! Shared fixtures for unit tests

use crate::services::notification::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use session_cache::{CacheError, CacheResult, StateStore};
use std::sync::Mutex;
use std::time::Duration;

/// State store whose every operation fails
pub struct FailingStore;

fn unavailable() -> CacheError {
    CacheError::Serialization(serde_json::from_str::<()>("unavailable").unwrap_err())
}

#[async_trait]
impl StateStore for FailingStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(unavailable())
    }

    async fn set(&self, _key: &str, _value: String) -> CacheResult<()> {
        Err(unavailable())
    }

    async fn set_with_expiration(
        &self,
        _key: &str,
        _value: String,
        _ttl: Duration,
    ) -> CacheResult<()> {
        Err(unavailable())
    }

    async fn delete(&self, _keys: &[&str]) -> CacheResult<()> {
        Err(unavailable())
    }

    async fn invalidate(&self, _prefix: &str) -> CacheResult<usize> {
        Err(unavailable())
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        Err(unavailable())
    }
}

/// Notifier that keeps every notification for inspection
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn last(&self) -> Option<Notification> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
