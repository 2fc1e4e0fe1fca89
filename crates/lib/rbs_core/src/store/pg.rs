//! PostgreSQL-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{CredentialStore, ResetStore, SessionStore};
use crate::auth::AuthError;
use crate::models::auth::{NewUser, PasswordReset, ProfileChanges, Session, User};

const USER_COLUMNS: &str = "id::text AS id, email, name, password_hash, role, is_admin, \
     is_active, email_verified, phone, bio, avatar, avatar_public_id, last_login_at, \
     created_at, updated_at";

const SESSION_COLUMNS: &str =
    "id::text AS id, token_hash, user_id::text AS user_id, created_at, expires_at";

const RESET_COLUMNS: &str = "id::text AS id, token_hash, user_id::text AS user_id, \
     expires_at, used, created_at, used_at";

/// Stores backed by a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-constraint violation on `users.email` to `Conflict`.
fn email_conflict(e: sqlx::Error) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict("Email is already in use".into())
        }
        _ => AuthError::DbError(e),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1::uuid"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash, role, is_admin) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(email_conflict)
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1::uuid")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1::uuid",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() != 1 {
            return Err(AuthError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               email = COALESCE($3, email), \
               phone = COALESCE($4, phone), \
               bio = COALESCE($5, bio), \
               avatar = COALESCE($6, avatar), \
               avatar_public_id = COALESCE($7, avatar_public_id), \
               updated_at = $8 \
             WHERE id = $1::uuid RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.avatar.as_deref())
        .bind(changes.avatar_public_id.as_deref())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(email_conflict)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: &Session) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO sessions (id, token_hash, user_id, created_at, expires_at) \
             VALUES ($1::uuid, $2, $3::uuid, $4, $5)",
        )
        .bind(&session.id)
        .bind(&session.token_hash)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AuthError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResetStore for PgStore {
    async fn delete_resets_for_user(&self, user_id: &str) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM password_resets WHERE user_id = $1::uuid")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_reset(&self, reset: &PasswordReset) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO password_resets (id, token_hash, user_id, expires_at, used, created_at) \
             VALUES ($1::uuid, $2, $3::uuid, $4, $5, $6)",
        )
        .bind(&reset.id)
        .bind(&reset.token_hash)
        .bind(&reset.user_id)
        .bind(reset.expires_at)
        .bind(reset.used)
        .bind(reset.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_unused_reset(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>, AuthError> {
        let reset = sqlx::query_as::<_, PasswordReset>(&format!(
            "SELECT {RESET_COLUMNS} FROM password_resets \
             WHERE token_hash = $1 AND used = FALSE"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reset)
    }

    async fn mark_reset_used(&self, reset_id: &str, at: DateTime<Utc>) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE password_resets SET used = TRUE, used_at = $2 \
             WHERE id = $1::uuid AND used = FALSE",
        )
        .bind(reset_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_reset(&self, reset_id: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE password_resets SET used = FALSE, used_at = NULL WHERE id = $1::uuid")
            .bind(reset_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
