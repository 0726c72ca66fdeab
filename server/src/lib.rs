use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use tokio_rusqlite::Connection;
use tracing::error;

use shared::types::ApiError;
use shared::types::server_config::AppConfig;

pub mod database;
pub mod handlers;
pub mod session;
pub mod tower_middle;

use session::{SessionManager, SessionSettings};

/// Request body as seen by the router. `main` boxes hyper's `Incoming`.
pub type RequestBody = BoxBody<Bytes, hyper::Error>;

pub type ResponseBody = BoxBody<Bytes, Infallible>;

/// Per-server state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Connection,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Resolve the signing secret and build the session manager.
    pub fn new(db: Connection, config: AppConfig) -> Result<Self> {
        let secret = config
            .auth
            .resolved_jwt_secret()
            .context("No JWT secret configured")?;
        let sessions = SessionManager::new(db.clone(), &secret, SessionSettings::from(&config.auth));

        Ok(Self {
            db,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        })
    }
}

/// Log any server-side failure (store, signing, hashing task) with context
/// and collapse it to [`ApiError::Internal`].
pub(crate) fn internal_failure<E: Display>(action: &'static str) -> impl FnOnce(E) -> ApiError {
    move |e| {
        error!("Failed to {}: {}", action, e);
        ApiError::Internal
    }
}
