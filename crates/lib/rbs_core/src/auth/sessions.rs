//! Session lifecycle: login, resolve, logout.
//!
//! A signed auth token is only a pointer to a session row. Handlers that need
//! the live user go through [`SessionManager::resolve`], which checks the row
//! still exists and has not expired.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::jwt::TokenCodec;
use super::password::{verify_decoy, verify_password};
use super::tokens::{generate_session_token, hash_token};
use super::{AuthError, normalize_email};
use crate::clock::Clock;
use crate::models::auth::{PublicUser, Session, SessionInfo, User};
use crate::store::{CredentialStore, SessionStore};

/// Session lifetime: 7 days, no sliding renewal.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Signed auth token for the session cookie.
    pub token: String,
    pub user: PublicUser,
    pub session: SessionInfo,
}

/// A token that resolved to a live session.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub user: User,
    pub session: Session,
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            codec,
            clock,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate with email + password and open a new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::ValidationError(
                "Email and password are required".into(),
            ));
        }

        // Unknown email and wrong password must be indistinguishable.
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            verify_decoy(password);
            debug!("login rejected: unknown email");
            return Err(AuthError::CredentialError);
        };
        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::CredentialError);
        }
        if !user.is_active {
            info!(user_id = %user.id, "login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        let now = self.clock.now();
        self.users.record_login(&user.id, now).await?;

        let session_token = generate_session_token();
        let session = Session {
            id: Uuid::now_v7().to_string(),
            token_hash: hash_token(&session_token),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(SESSION_TTL_SECS),
        };
        self.sessions.create_session(&session).await?;

        let token = self.codec.mint(&user, &session_token, now)?;
        info!(user_id = %user.id, session_id = %session.id, "user logged in");

        let mut public = user.sanitized();
        public.last_login_at = Some(now);
        Ok(LoginOutcome {
            token,
            user: public,
            session: SessionInfo::from(&session),
        })
    }

    /// Resolve an auth token to its live session and user.
    ///
    /// Every way of failing (bad token, unknown session, expired session,
    /// deleted user) yields `Ok(None)`. Only store failures are errors.
    pub async fn resolve(&self, token: &str) -> Result<Option<ResolvedSession>, AuthError> {
        // Expiry is judged by the session row, so an expired row is still
        // found and removed.
        let Some(claims) = self.codec.verify_signature(token) else {
            return Ok(None);
        };
        let token_hash = hash_token(&claims.session_token);
        let Some(session) = self.sessions.find_session(&token_hash).await? else {
            debug!(user_id = %claims.sub, "session not found");
            return Ok(None);
        };
        if session.is_expired(self.clock.now()) {
            debug!(session_id = %session.id, "session expired, removing");
            self.sessions.delete_session(&token_hash).await?;
            return Ok(None);
        }
        let Some(user) = self.users.find_user_by_id(&session.user_id).await? else {
            debug!(session_id = %session.id, "session owner no longer exists");
            return Ok(None);
        };
        Ok(Some(ResolvedSession { user, session }))
    }

    /// Delete the session behind `token`. Invalid tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if let Some(claims) = self.codec.verify_signature(token) {
            self.sessions
                .delete_session(&hash_token(&claims.session_token))
                .await?;
            info!(user_id = %claims.sub, "user logged out");
        }
        Ok(())
    }
}
