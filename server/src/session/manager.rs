use std::time::Duration;

use tokio_rusqlite::Connection;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared::types::server_config::AuthConfig;
use shared::types::{AccessClaims, ApiError, Identity, RefreshClaims};

use crate::database::refresh_tokens::{self, NewRefreshToken};
use crate::database::users::User;
use crate::database::utils::get_timestamp;
use crate::session::cookies::{CookieJar, CookieOptions, SameSite};
use crate::session::tokens::TokenKeys;
use crate::internal_failure;

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// The refresh cookie is only sent to the auth endpoints.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Lifetimes and cookie policy for a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub secure_cookies: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(60 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            secure_cookies: false,
        }
    }
}

impl From<&AuthConfig> for SessionSettings {
    fn from(auth: &AuthConfig) -> Self {
        Self {
            access_ttl: auth.access_token_ttl(),
            refresh_ttl: auth.refresh_token_ttl(),
            secure_cookies: auth.secure_cookies,
        }
    }
}

/// Issues, verifies, rotates and revokes token pairs.
///
/// Access tokens are stateless. Every live refresh token has exactly one
/// row in `refresh_tokens`; a token string whose row is gone can never be
/// used again.
pub struct SessionManager {
    db: Connection,
    keys: TokenKeys,
    settings: SessionSettings,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(db: Connection, secret: &str, settings: SessionSettings) -> Self {
        Self {
            db,
            keys: TokenKeys::new(secret),
            settings,
        }
    }

    // ── Core lifecycle ────────────────────────────────────────────────────────

    /// Sign a fresh pair for `user` and persist the refresh half.
    pub async fn issue(&self, user: &User) -> Result<TokenPair, ApiError> {
        let access_token = self.sign_access(user)?;
        let (refresh_token, expires_at) = self.sign_refresh(user.id)?;

        refresh_tokens::insert_refresh_token(
            &self.db,
            NewRefreshToken {
                token: refresh_token.clone(),
                user_id: user.id,
                expires_at,
            },
        )
        .await
        .map_err(internal_failure("store refresh token"))?;

        info!("Session issued for user {}", user.id);

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Signature and expiry only; the store is not consulted.
    pub fn verify(&self, access_token: &str) -> Result<Identity, ApiError> {
        self.keys
            .decode_access(access_token)
            .map(Identity::from)
            .ok_or(ApiError::Unauthorized)
    }

    /// Trade a refresh token for a new pair. Succeeds at most once per token.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, ApiError> {
        let Some(claims) = self.keys.decode_refresh(presented) else {
            warn!("Refresh rejected: token failed verification");
            return Err(ApiError::Unauthorized);
        };

        let (refresh_token, expires_at) = self.sign_refresh(claims.user_id)?;

        let rotated = refresh_tokens::rotate_refresh_token(
            &self.db,
            presented.to_string(),
            NewRefreshToken {
                token: refresh_token.clone(),
                user_id: claims.user_id,
                expires_at,
            },
        )
        .await
        .map_err(internal_failure("rotate refresh token"))?;

        let Some(user) = rotated else {
            warn!(
                "Refresh rejected for user {}: token unknown, spent or orphaned",
                claims.user_id
            );
            return Err(ApiError::Unauthorized);
        };

        let access_token = self.sign_access(&user)?;
        info!("Session rotated for user {}", user.id);

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Forget a refresh token. Never fails; store errors are only logged.
    pub async fn revoke(&self, presented: &str) {
        match refresh_tokens::delete_refresh_token(&self.db, presented.to_string()).await {
            Ok(0) => debug!("Revoke: no matching session"),
            Ok(_) => info!("Session revoked"),
            Err(e) => error!("Failed to revoke refresh token: {}", e),
        }
    }

    /// Drop refresh rows whose expiry has passed.
    pub async fn purge_expired(&self) -> Result<usize, ApiError> {
        refresh_tokens::purge_expired_refresh_tokens(&self.db)
            .await
            .map_err(internal_failure("purge expired refresh tokens"))
    }

    // ── Cookie-aware wrappers ─────────────────────────────────────────────────

    pub fn refresh_cookie_options(&self) -> CookieOptions {
        CookieOptions {
            max_age: Some(self.settings.refresh_ttl),
            path: Some(REFRESH_COOKIE_PATH.to_string()),
            http_only: true,
            secure: self.settings.secure_cookies,
            same_site: SameSite::Lax,
        }
    }

    /// Issue a pair and hand the refresh token to the cookie jar.
    pub async fn login<J: CookieJar>(&self, user: &User, jar: &mut J) -> Result<TokenPair, ApiError> {
        let pair = self.issue(user).await?;
        jar.set_cookie(REFRESH_COOKIE, &pair.refresh_token, &self.refresh_cookie_options());
        Ok(pair)
    }

    /// Rotate the cookie token, or the body token when there is no cookie.
    pub async fn refresh<J: CookieJar>(
        &self,
        jar: &mut J,
        body_token: Option<String>,
    ) -> Result<TokenPair, ApiError> {
        let Some(presented) = presented_token(jar, body_token) else {
            warn!("Refresh rejected: no token presented");
            return Err(ApiError::Unauthorized);
        };

        let pair = self.rotate(&presented).await?;
        jar.set_cookie(REFRESH_COOKIE, &pair.refresh_token, &self.refresh_cookie_options());
        Ok(pair)
    }

    /// Revoke whatever token was presented and always clear the cookie.
    pub async fn logout<J: CookieJar>(&self, jar: &mut J, body_token: Option<String>) {
        if let Some(presented) = presented_token(jar, body_token) {
            self.revoke(&presented).await;
        }
        jar.clear_cookie(REFRESH_COOKIE, &self.refresh_cookie_options());
    }

    // ── Signing ───────────────────────────────────────────────────────────────

    fn sign_access(&self, user: &User) -> Result<String, ApiError> {
        let iat = get_timestamp();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            user_id: user.id,
            email: user.email.clone(),
            iat,
            exp: iat + self.settings.access_ttl.as_secs() as i64,
        };
        self.keys
            .sign_access(&claims)
            .map_err(internal_failure("sign access token"))
    }

    /// Returns the signed token and its expiry timestamp.
    fn sign_refresh(&self, user_id: i64) -> Result<(String, i64), ApiError> {
        let iat = get_timestamp();
        let exp = iat + self.settings.refresh_ttl.as_secs() as i64;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            user_id,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
        };
        let token = self
            .keys
            .sign_refresh(&claims)
            .map_err(internal_failure("sign refresh token"))?;
        Ok((token, exp))
    }
}

/// Cookie first, then the body field. Empty values count as absent.
fn presented_token<J: CookieJar>(jar: &J, body_token: Option<String>) -> Option<String> {
    jar.read_cookie(REFRESH_COOKIE)
        .filter(|t| !t.is_empty())
        .or(body_token.filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::database::open_database;
    use crate::database::refresh_tokens::count_refresh_tokens_for_user;
    use crate::database::users::{NewUser, Registration, get_user_by_id, register_user};

    const SECRET: &str = "session-manager-unit-test-secret-0123456789";

    #[derive(Default)]
    struct TestJar {
        incoming: HashMap<String, String>,
        set: Vec<(String, String, CookieOptions)>,
        cleared: Vec<String>,
    }

    impl CookieJar for TestJar {
        fn read_cookie(&self, name: &str) -> Option<String> {
            self.incoming.get(name).cloned()
        }

        fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) {
            self.set.push((name.into(), value.into(), options.clone()));
        }

        fn clear_cookie(&mut self, name: &str, _options: &CookieOptions) {
            self.cleared.push(name.into());
        }
    }

    async fn setup() -> (SessionManager, User, Connection) {
        let db = open_database(":memory:").await.unwrap();
        let new_user = NewUser {
            email: "a@x.com".into(),
            password_hash: "hash".into(),
            nickname: "Ann".into(),
        };
        let Registration::Created(id) = register_user(&db, new_user).await.unwrap() else {
            panic!("expected a new user");
        };
        let user = get_user_by_id(&db, id).await.unwrap().unwrap();
        let manager = SessionManager::new(db.clone(), SECRET, SessionSettings::default());
        (manager, user, db)
    }

    #[tokio::test]
    async fn issue_then_verify() {
        let (manager, user, db) = setup().await;
        let pair = manager.issue(&user).await.unwrap();

        let identity = manager.verify(&pair.access_token).unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(count_refresh_tokens_for_user(&db, user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn refresh_token_does_not_verify_as_access() {
        let (manager, user, _db) = setup().await;
        let pair = manager.issue(&user).await.unwrap();
        assert_eq!(
            manager.verify(&pair.refresh_token),
            Err(ApiError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn two_issues_in_one_second_are_distinct() {
        let (manager, user, db) = setup().await;
        let a = manager.issue(&user).await.unwrap();
        let b = manager.issue(&user).await.unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
        assert_eq!(count_refresh_tokens_for_user(&db, user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rotate_is_single_use() {
        let (manager, user, db) = setup().await;
        let pair = manager.issue(&user).await.unwrap();

        let next = manager.rotate(&pair.refresh_token).await.unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);
        assert_eq!(manager.verify(&next.access_token).unwrap().user_id, user.id);

        assert_eq!(
            manager.rotate(&pair.refresh_token).await,
            Err(ApiError::Unauthorized)
        );
        assert_eq!(count_refresh_tokens_for_user(&db, user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rotate_rejects_access_tokens() {
        let (manager, user, _db) = setup().await;
        let pair = manager.issue(&user).await.unwrap();
        assert_eq!(
            manager.rotate(&pair.access_token).await,
            Err(ApiError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn login_sets_scoped_cookie() {
        let (manager, user, _db) = setup().await;
        let mut jar = TestJar::default();
        let pair = manager.login(&user, &mut jar).await.unwrap();

        let (name, value, options) = &jar.set[0];
        assert_eq!(name, REFRESH_COOKIE);
        assert_eq!(value, &pair.refresh_token);
        assert!(options.http_only);
        assert_eq!(options.same_site, SameSite::Lax);
        assert_eq!(options.path.as_deref(), Some("/api/auth"));
        assert_eq!(options.max_age, Some(Duration::from_secs(7 * 24 * 60 * 60)));
    }

    #[tokio::test]
    async fn refresh_prefers_cookie_over_body() {
        let (manager, user, _db) = setup().await;
        let from_cookie = manager.issue(&user).await.unwrap();
        let from_body = manager.issue(&user).await.unwrap();

        let mut jar = TestJar::default();
        jar.incoming
            .insert(REFRESH_COOKIE.into(), from_cookie.refresh_token.clone());

        manager
            .refresh(&mut jar, Some(from_body.refresh_token.clone()))
            .await
            .unwrap();

        // The cookie token was spent, the body token was not.
        assert!(manager.rotate(&from_cookie.refresh_token).await.is_err());
        assert!(manager.rotate(&from_body.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_without_any_token_is_unauthorized() {
        let (manager, _user, _db) = setup().await;
        let mut jar = TestJar::default();
        assert_eq!(
            manager.refresh(&mut jar, None).await,
            Err(ApiError::Unauthorized)
        );
        assert!(jar.set.is_empty());
    }

    #[tokio::test]
    async fn logout_clears_cookie_even_without_token() {
        let (manager, user, db) = setup().await;
        let pair = manager.issue(&user).await.unwrap();

        let mut empty = TestJar::default();
        manager.logout(&mut empty, None).await;
        assert_eq!(empty.cleared, vec![REFRESH_COOKIE.to_string()]);

        let mut jar = TestJar::default();
        manager.logout(&mut jar, Some(pair.refresh_token)).await;
        assert_eq!(count_refresh_tokens_for_user(&db, user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn secure_flag_follows_settings() {
        let (_, _, db) = setup().await;
        let manager = SessionManager::new(
            db,
            SECRET,
            SessionSettings {
                secure_cookies: true,
                ..SessionSettings::default()
            },
        );
        assert!(manager.refresh_cookie_options().secure);
    }
}
