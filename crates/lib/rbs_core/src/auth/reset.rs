//! Password reset: issue a one-time, one-hour token and consume it.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{hash_password, validate_new_password};
use super::tokens::{RESET_TOKEN_LEN, generate_reset_token, hash_token};
use super::{AuthError, is_plausible_email, normalize_email};
use crate::clock::Clock;
use crate::mail::{Mailer, reset_message};
use crate::models::auth::PasswordReset;
use crate::store::{CredentialStore, ResetStore};

/// Reset token lifetime: 1 hour.
pub const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Issues and consumes password reset tokens.
#[derive(Clone)]
pub struct PasswordResetFlow {
    users: Arc<dyn CredentialStore>,
    resets: Arc<dyn ResetStore>,
    mailer: Option<Arc<dyn Mailer>>,
    clock: Arc<dyn Clock>,
    /// Public origin used to build the reset link, without trailing slash.
    app_origin: String,
}

impl fmt::Debug for PasswordResetFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordResetFlow")
            .field("mail_configured", &self.mailer.is_some())
            .field("app_origin", &self.app_origin)
            .finish_non_exhaustive()
    }
}

impl PasswordResetFlow {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        resets: Arc<dyn ResetStore>,
        mailer: Option<Arc<dyn Mailer>>,
        clock: Arc<dyn Clock>,
        app_origin: &str,
    ) -> Self {
        Self {
            users,
            resets,
            mailer,
            clock,
            app_origin: app_origin.trim_end_matches('/').to_string(),
        }
    }

    /// Issue a fresh reset token for `email` and mail the link.
    ///
    /// Any previously issued token for the same user stops working.
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            return Err(AuthError::ValidationError(
                "A valid email address is required".into(),
            ));
        }

        let Some(user) = self.users.find_user_by_email(&email).await? else {
            return Err(AuthError::NotFound("No account found for that email".into()));
        };

        let Some(mailer) = &self.mailer else {
            return Err(AuthError::ConfigError(
                "mail relay credentials are not configured".into(),
            ));
        };

        let revoked = self.resets.delete_resets_for_user(&user.id).await?;
        if revoked > 0 {
            debug!(user_id = %user.id, revoked, "discarded earlier reset tokens");
        }

        let now = self.clock.now();
        let token = generate_reset_token();
        let reset = PasswordReset {
            id: Uuid::now_v7().to_string(),
            token_hash: hash_token(&token),
            user_id: user.id.clone(),
            expires_at: now + Duration::seconds(RESET_TOKEN_TTL_SECS),
            used: false,
            created_at: now,
            used_at: None,
        };
        self.resets.create_reset(&reset).await?;

        let link = format!("{}/reset-password?token={token}", self.app_origin);
        mailer
            .send(&reset_message(&user.email, &user.name, &link))
            .await?;

        info!(user_id = %user.id, reset_id = %reset.id, "password reset issued");
        Ok(())
    }

    /// Set a new password using a reset token.
    pub async fn consume_reset(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let token = token.trim();
        if token.len() < RESET_TOKEN_LEN {
            return Err(AuthError::ValidationError("Invalid reset token".into()));
        }
        validate_new_password(new_password)?;

        let Some(reset) = self.resets.find_unused_reset(&hash_token(token)).await? else {
            return Err(AuthError::InvalidResetToken);
        };
        let now = self.clock.now();
        if reset.expires_at <= now {
            debug!(reset_id = %reset.id, "reset token expired");
            return Err(AuthError::ResetTokenExpired);
        }

        let password_hash = hash_password(new_password)?;

        // The conditional claim is what serializes concurrent consumers.
        if !self.resets.mark_reset_used(&reset.id, now).await? {
            debug!(reset_id = %reset.id, "reset token claimed by a concurrent request");
            return Err(AuthError::InvalidResetToken);
        }
        if let Err(e) = self
            .users
            .update_password(&reset.user_id, &password_hash, now)
            .await
        {
            warn!(reset_id = %reset.id, error = %e, "password write failed, releasing reset token");
            self.resets.release_reset(&reset.id).await?;
            return Err(e);
        }

        info!(user_id = %reset.user_id, reset_id = %reset.id, "password reset completed");
        Ok(())
    }
}
