//! Configuration management for Identity Service
//!
//! Loads settings from environment variables, with a `.env` file picked up in
//! debug builds for local development.
//!
//! # Example
//!
//! ```no_run
//! use identity_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("JWT issuer: {}", settings.jwt.issuer);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use crypto_core::JwtConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt: JwtSettings,
    pub otp: OtpSettings,
    pub cache: CacheSettings,
    pub email: EmailSettings,
    pub jobs: JobSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            jwt: JwtSettings::from_env()?,
            otp: OtpSettings::from_env()?,
            cache: CacheSettings::from_env()?,
            email: EmailSettings::from_env()?,
            jobs: JobSettings::from_env()?,
        })
    }
}

/// Parse an env var with a default, naming the variable on failure
fn env_or<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

/// JWT signing settings (HS256)
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    /// Seconds
    pub access_token_ttl: u64,
    /// Seconds
    pub refresh_token_ttl: u64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let settings = Self {
            secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "identity-service".to_string()),
            access_token_ttl: env_or("JWT_ACCESS_TOKEN_TTL", "3600")?,
            refresh_token_ttl: env_or("JWT_REFRESH_TOKEN_TTL", "86400")?,
        };

        if settings.refresh_token_ttl < settings.access_token_ttl {
            bail!("JWT_REFRESH_TOKEN_TTL must not be shorter than JWT_ACCESS_TOKEN_TTL");
        }

        Ok(settings)
    }

    pub fn to_jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.secret.clone(),
            issuer: self.issuer.clone(),
            access_ttl: Duration::from_secs(self.access_token_ttl),
            refresh_ttl: Duration::from_secs(self.refresh_token_ttl),
        }
    }
}

/// One-time code settings
#[derive(Debug, Clone)]
pub struct OtpSettings {
    /// Number of digits
    pub length: i32,
    /// Seconds a pending verification stays valid
    pub ttl: u64,
}

impl OtpSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            length: env_or("OTP_LENGTH", "6")?,
            ttl: env_or("OTP_TTL", "600")?,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => bail!("Unknown cache backend: {}", other),
        }
    }
}

/// Ephemeral state store settings
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    /// Default TTL in seconds for plain `set`
    pub default_ttl: u64,
    /// Seconds
    pub redis_connection_timeout: u64,
    /// Seconds
    pub redis_response_timeout: u64,
}

impl CacheSettings {
    fn from_env() -> Result<Self> {
        let backend: CacheBackend = env::var("CACHE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()
            .context("Invalid CACHE_BACKEND")?;

        let redis_url = env::var("REDIS_URL").ok();
        if backend == CacheBackend::Redis && redis_url.is_none() {
            bail!("REDIS_URL must be set when CACHE_BACKEND=redis");
        }

        Ok(Self {
            backend,
            redis_url,
            default_ttl: env_or("CACHE_DEFAULT_TTL", "300")?,
            redis_connection_timeout: env_or("REDIS_CONNECTION_TIMEOUT", "5")?,
            redis_response_timeout: env_or("REDIS_RESPONSE_TIMEOUT", "5")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierBackend {
    Smtp,
    Log,
}

impl FromStr for NotifierBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(NotifierBackend::Smtp),
            "log" => Ok(NotifierBackend::Log),
            other => bail!("Unknown notifier: {}", other),
        }
    }
}

/// Email delivery settings
#[derive(Debug, Clone)]
pub struct EmailSettings {
    /// `log` skips SMTP entirely and writes notifications to the log
    pub notifier: NotifierBackend,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        let notifier = env::var("NOTIFIER")
            .unwrap_or_else(|_| "smtp".to_string())
            .parse()
            .context("Invalid NOTIFIER")?;

        Ok(Self {
            notifier,
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env_or("SMTP_PORT", "1025")?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@nova.dev".to_string()),
            use_starttls: env::var("SMTP_USE_STARTTLS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }
}

/// Periodic cleanup settings
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Seconds between revocation sweeps
    pub revocation_sweep_interval: u64,
    /// Days a soft-deleted user is kept before purge
    pub deleted_user_retention_days: i64,
    /// Seconds between deleted-user purges
    pub deleted_user_sweep_interval: u64,
}

impl JobSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            revocation_sweep_interval: env_or("REVOCATION_SWEEP_INTERVAL", "3600")?,
            deleted_user_retention_days: env_or("DELETED_USER_RETENTION_DAYS", "30")?,
            deleted_user_sweep_interval: env_or("DELETED_USER_SWEEP_INTERVAL", "86400")?,
        })
    }
}
