use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use shared::types::{AccessClaims, RefreshClaims};

/// HS256 signing and verification keys derived from one shared secret.
///
/// Verification checks signature and `exp` with zero leeway. Access and
/// refresh claims have different required fields, so a token of one kind
/// never decodes as the other.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys").finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign_access(&self, claims: &AccessClaims) -> jsonwebtoken::errors::Result<String> {
        self.sign(claims)
    }

    pub fn sign_refresh(&self, claims: &RefreshClaims) -> jsonwebtoken::errors::Result<String> {
        self.sign(claims)
    }

    /// `None` for anything that is not a live access token signed by us.
    pub fn decode_access(&self, token: &str) -> Option<AccessClaims> {
        self.decode(token)
            .filter(|claims: &AccessClaims| claims.sub == claims.user_id.to_string())
    }

    /// `None` for anything that is not a live refresh token signed by us.
    pub fn decode_refresh(&self, token: &str) -> Option<RefreshClaims> {
        self.decode(token)
            .filter(|claims: &RefreshClaims| claims.sub == claims.user_id.to_string())
    }

    fn sign<T: Serialize>(&self, claims: &T) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        match decode::<T>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Token rejected: {:?}", e.kind());
                None
            }
        }
    }
}
