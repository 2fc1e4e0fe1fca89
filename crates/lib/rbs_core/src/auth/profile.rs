//! Profile updates for the signed-in user.

use std::sync::Arc;

use tracing::info;

use super::{AuthError, is_plausible_email, normalize_email};
use crate::clock::Clock;
use crate::models::auth::{ProfileChanges, PublicUser};
use crate::store::CredentialStore;

#[derive(Debug, Clone)]
pub struct ProfileService {
    users: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    /// Apply a partial update and return the sanitized user.
    pub async fn update_profile(
        &self,
        user_id: &str,
        changes: ProfileChanges,
    ) -> Result<PublicUser, AuthError> {
        if changes.is_empty() {
            return Err(AuthError::ValidationError("No changes".into()));
        }
        let changes = normalize_changes(changes)?;

        if let Some(email) = &changes.email
            && let Some(owner) = self.users.find_user_by_email(email).await?
            && owner.id != user_id
        {
            return Err(AuthError::Conflict("Email is already in use".into()));
        }

        let user = self
            .users
            .update_profile(user_id, &changes, self.clock.now())
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        info!(user_id = %user.id, "profile updated");
        Ok(user.sanitized())
    }
}

fn normalize_changes(mut changes: ProfileChanges) -> Result<ProfileChanges, AuthError> {
    if let Some(name) = changes.name.take() {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AuthError::ValidationError("Name cannot be empty".into()));
        }
        changes.name = Some(name);
    }
    if let Some(email) = changes.email.take() {
        let email = normalize_email(&email);
        if !is_plausible_email(&email) {
            return Err(AuthError::ValidationError(
                "A valid email address is required".into(),
            ));
        }
        changes.email = Some(email);
    }
    Ok(changes)
}
