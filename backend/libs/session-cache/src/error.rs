//! Cache error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid invalidation prefix: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;
