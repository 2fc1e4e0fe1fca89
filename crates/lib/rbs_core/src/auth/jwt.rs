//! JWT token generation and verification.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;

use super::AuthError;
use crate::models::auth::{AuthClaims, User};

/// Auth token lifetime: 7 days. Matches the session and cookie lifetime.
pub const AUTH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Signs and verifies the authorization token carried in the session cookie.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from an HS256 secret. An empty secret is a configuration error.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::ConfigError("JWT signing secret is not configured".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Sign a token for `user` that points at `session_token`.
    pub fn mint(
        &self,
        user: &User,
        session_token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = AuthClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            is_admin: user.is_admin,
            session_token: session_token.to_string(),
            exp: (now + Duration::seconds(AUTH_TOKEN_TTL_SECS)).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Verify a token, returning the claims on success.
    ///
    /// Bad signatures, malformed input and expired tokens all yield `None`;
    /// stale or tampered cookies are ordinary traffic.
    pub fn verify(&self, token: &str) -> Option<AuthClaims> {
        self.decode(token, true)
    }

    /// Check the signature only, ignoring `exp`.
    ///
    /// For callers that judge expiry from the session row themselves and must
    /// still find rows whose token has lapsed.
    pub fn verify_signature(&self, token: &str) -> Option<AuthClaims> {
        self.decode(token, false)
    }

    fn decode(&self, token: &str, check_exp: bool) -> Option<AuthClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = check_exp;
        match decode::<AuthClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                warn!(error = %e, "rejected auth token");
                None
            }
        }
    }
}

/// Resolve the signing secret: `JWT_SECRET` → `AUTH_SECRET`.
///
/// There is no generated fallback; a missing secret stops startup.
pub fn resolve_jwt_secret(lookup: impl Fn(&str) -> Option<String>) -> Result<String, AuthError> {
    ["JWT_SECRET", "AUTH_SECRET"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|secret| !secret.trim().is_empty())
        .ok_or_else(|| {
            AuthError::ConfigError("JWT_SECRET or AUTH_SECRET must be set".into())
        })
}
