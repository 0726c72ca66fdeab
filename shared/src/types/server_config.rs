use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Shortest signing secret the server will start with.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bounds on the configured lifetimes (one week, one year, one week).
pub const MAX_ACCESS_TOKEN_MINUTES: u64 = 7 * 24 * 60;
pub const MAX_REFRESH_TOKEN_DAYS: u64 = 365;
pub const MAX_PURGE_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Single browser origin allowed to call the API with credentials.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC key used to sign and verify both token kinds.
    ///
    /// Prefer loading this via the `JWT_SECRET` environment variable; this
    /// field is the fallback. **Minimum length:** 32 characters. Changing it
    /// invalidates every outstanding access and refresh token.
    pub jwt_secret: Option<String>,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: u64,
    /// Adds `Secure` to the refresh cookie. Turn on behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    /// How often expired refresh-token rows are purged. 0 disables the job.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_minutes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:4000"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_minutes.saturating_mul(60))
    }

    /// Refresh lifetime, also used as the refresh cookie `Max-Age`.
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_days.saturating_mul(24 * 60 * 60))
    }

    /// `None` when the purge job is disabled.
    pub fn purge_interval(&self) -> Option<Duration> {
        match self.purge_interval_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes.saturating_mul(60))),
        }
    }

    /// Resolve the JWT secret with the `JWT_SECRET` env var taking priority
    /// over the config file field.
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        resolve_secret(std::env::var("JWT_SECRET").ok(), self.jwt_secret.clone())
    }
}

/// Empty values count as unset on both sides.
pub fn resolve_secret(from_env: Option<String>, from_file: Option<String>) -> Option<String> {
    from_env
        .filter(|s| !s.is_empty())
        .or(from_file)
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    4000
}

pub fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

pub fn default_request_timeout() -> u64 {
    30
}

pub fn default_database_path() -> String {
    "daymark.db".to_string()
}

pub fn default_access_token_minutes() -> u64 {
    60
}

pub fn default_refresh_token_days() -> u64 {
    7
}

pub fn default_purge_interval() -> u64 {
    60
}
