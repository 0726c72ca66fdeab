use serde::{Deserialize, Serialize};

/// Claims embedded in every access token.
///
/// Access tokens are verified by signature and expiry alone, with zero store
/// reads. They are not individually revocable: a leaked access token stays
/// valid until `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Standard JWT subject: the user id rendered as a string.
    pub sub: String,

    /// Numeric user ID (matches `users.id`).
    pub user_id: i64,

    /// Email at the time the token was signed.
    pub email: String,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,

    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: i64,
}

/// Claims embedded in every refresh token.
///
/// Deliberately narrower than [`AccessClaims`]: no email. The signed string
/// is also the primary key of its `refresh_tokens` row, so `jti` keeps two
/// tokens issued to the same user within one second distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub user_id: i64,

    /// Random UUID v4.
    pub jti: String,

    pub iat: i64,
    pub exp: i64,
}

/// The verified identity the request gate hands to resource handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
}

impl From<AccessClaims> for Identity {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}
