use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use crate::types::server_config::{
    AppConfig, ConfigError, MAX_ACCESS_TOKEN_MINUTES, MAX_PURGE_INTERVAL_MINUTES,
    MAX_REFRESH_TOKEN_DAYS, MIN_JWT_SECRET_LEN,
};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path.display());

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config = parse_config(&contents)?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Parse and validate a TOML document.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(contents)?;

    validate_config(&config)?;
    info!("Config validated");

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.bind.trim().is_empty() {
        return Err(ConfigError::InvalidConfig("server.bind cannot be empty".into()));
    }

    if config.server.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "request_timeout_secs must be greater than 0".into(),
        ));
    }

    if config.database.path.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "database.path cannot be empty".into(),
        ));
    }

    if config.auth.access_token_minutes == 0 {
        return Err(ConfigError::InvalidConfig(
            "access_token_minutes must be greater than 0".into(),
        ));
    }

    if config.auth.access_token_minutes > MAX_ACCESS_TOKEN_MINUTES {
        return Err(ConfigError::InvalidConfig(format!(
            "access_token_minutes must be at most {}",
            MAX_ACCESS_TOKEN_MINUTES
        )));
    }

    if config.auth.refresh_token_days == 0 {
        return Err(ConfigError::InvalidConfig(
            "refresh_token_days must be greater than 0".into(),
        ));
    }

    if config.auth.refresh_token_days > MAX_REFRESH_TOKEN_DAYS {
        return Err(ConfigError::InvalidConfig(format!(
            "refresh_token_days must be at most {}",
            MAX_REFRESH_TOKEN_DAYS
        )));
    }

    if config.auth.purge_interval_minutes > MAX_PURGE_INTERVAL_MINUTES {
        return Err(ConfigError::InvalidConfig(format!(
            "purge_interval_minutes must be at most {}",
            MAX_PURGE_INTERVAL_MINUTES
        )));
    }

    // Validated here so a bad config is rejected at startup rather than
    // failing at the first login.
    match config.auth.resolved_jwt_secret() {
        None => {
            return Err(ConfigError::InvalidConfig(
                "jwt_secret must be set via the JWT_SECRET env var or auth.jwt_secret config field"
                    .into(),
            ));
        }
        Some(secret) if secret.len() < MIN_JWT_SECRET_LEN => {
            return Err(ConfigError::InvalidConfig(format!(
                "jwt_secret must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            )));
        }
        _ => {}
    }

    Ok(())
}
