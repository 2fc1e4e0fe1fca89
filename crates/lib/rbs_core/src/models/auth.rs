//! Authentication domain models.
//!
//! These are internal domain models. `PublicUser` is the only user shape that
//! leaves the process; it never carries the password hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default role for accounts that were not granted anything else.
pub const DEFAULT_ROLE: &str = "customer";

/// Role name that grants admin routes regardless of the admin flag.
pub const ADMIN_ROLE: &str = "admin";

/// Stored user record, including the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Normalized (trimmed, lowercased) email. Unique across users.
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub email_verified: bool,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub avatar_public_id: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Copy of the user with the password hash stripped.
    pub fn sanitized(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// User as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub email_verified: bool,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub avatar_public_id: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            is_admin: user.is_admin,
            is_active: user.is_active,
            email_verified: user.email_verified,
            phone: user.phone.clone(),
            bio: user.bio.clone(),
            avatar: user.avatar.clone(),
            avatar_public_id: user.avatar_public_id.clone(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields needed to insert a user. The email must already be normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub is_admin: bool,
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub avatar_public_id: Option<String>,
}

impl ProfileChanges {
    /// True when no field was supplied.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.bio.is_none()
            && self.avatar.is_none()
            && self.avatar_public_id.is_none()
    }
}

/// Session row. Only the SHA-256 of the session token is stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session metadata as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Password reset record. Only the SHA-256 of the reset token is stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: String,
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

/// JWT claims embedded in the `rbs_session` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClaims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub is_admin: bool,
    /// Raw session token; resolved against the session store by handlers.
    pub session_token: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl AuthClaims {
    /// Admin check used by the route gate.
    pub fn has_admin_access(&self) -> bool {
        self.is_admin || self.role == ADMIN_ROLE
    }
}
