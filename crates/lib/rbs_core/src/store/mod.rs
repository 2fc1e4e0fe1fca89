//! Persistence contracts for users, sessions and password resets.
//!
//! Every mutating method is a single-row write; callers never need a
//! transaction spanning several calls.

pub mod memory;
pub mod pg;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::AuthError;
use crate::models::auth::{NewUser, PasswordReset, ProfileChanges, Session, User};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// User records.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Look up a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError>;

    /// Insert a user. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError>;

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Fails with `NotFound` if no user has `user_id`.
    async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Apply the supplied fields. Returns `None` if the user does not exist and
    /// `Conflict` if the new email belongs to someone else.
    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError>;
}

/// Session rows keyed by token hash.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    async fn create_session(&self, session: &Session) -> Result<(), AuthError>;

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AuthError>;

    /// Delete a session. Deleting a missing session is not an error.
    async fn delete_session(&self, token_hash: &str) -> Result<(), AuthError>;
}

/// Password reset records.
#[async_trait]
pub trait ResetStore: Send + Sync + fmt::Debug {
    /// Delete every reset record belonging to `user_id`, used or not.
    async fn delete_resets_for_user(&self, user_id: &str) -> Result<u64, AuthError>;

    async fn create_reset(&self, reset: &PasswordReset) -> Result<(), AuthError>;

    /// Find an unused record by token hash, expired or not.
    async fn find_unused_reset(&self, token_hash: &str)
    -> Result<Option<PasswordReset>, AuthError>;

    /// Flip `used` from false to true. Returns `false` if the record was
    /// already used, so exactly one concurrent caller wins.
    async fn mark_reset_used(&self, reset_id: &str, at: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Undo a claim so the token can be retried after a failed password write.
    async fn release_reset(&self, reset_id: &str) -> Result<(), AuthError>;
}
