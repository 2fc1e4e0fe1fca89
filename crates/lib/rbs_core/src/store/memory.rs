//! In-memory stores for tests and local development.
//!
//! Same contracts as the Postgres stores, including email uniqueness and the
//! conditional reset-token claim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{CredentialStore, ResetStore, SessionStore};
use crate::auth::AuthError;
use crate::models::auth::{NewUser, PasswordReset, ProfileChanges, Session, User};

/// Lock order when both maps are touched: `emails` before `users`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// Normalized email → user id.
    emails: DashMap<String, String>,
    /// Keyed by token hash.
    sessions: DashMap<String, Session>,
    /// Keyed by record id.
    resets: DashMap<String, PasswordReset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Reset records for a user, used or not.
    pub fn resets_for_user(&self, user_id: &str) -> Vec<PasswordReset> {
        self.resets
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Toggle the active flag (accounts are disabled by an admin collaborator).
    pub fn set_active(&self, user_id: &str, active: bool) {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let Some(id) = self.emails.get(email).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::Conflict("Email is already in use".into())),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = User {
                    id: Uuid::new_v4().to_string(),
                    email: user.email,
                    name: user.name,
                    password_hash: user.password_hash,
                    role: user.role,
                    is_admin: user.is_admin,
                    is_active: true,
                    email_verified: false,
                    phone: None,
                    bio: None,
                    avatar: None,
                    avatar_public_id: None,
                    last_login_at: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(record.id.clone());
                self.users.insert(record.id.clone(), record.clone());
                Ok(record)
            }
        }
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let Some(mut user) = self.users.get_mut(user_id) else {
            return Err(AuthError::NotFound("User not found".into()));
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = at;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AuthError> {
        let Some(old_email) = self.users.get(user_id).map(|u| u.email.clone()) else {
            return Ok(None);
        };

        if let Some(new_email) = changes.email.as_ref().filter(|e| **e != old_email) {
            match self.emails.entry(new_email.clone()) {
                Entry::Occupied(_) => {
                    return Err(AuthError::Conflict("Email is already in use".into()));
                }
                Entry::Vacant(slot) => {
                    slot.insert(user_id.to_string());
                }
            }
            self.emails.remove(&old_email);
        }

        let Some(mut user) = self.users.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(phone) = &changes.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(bio) = &changes.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(avatar) = &changes.avatar {
            user.avatar = Some(avatar.clone());
        }
        if let Some(avatar_public_id) = &changes.avatar_public_id {
            user.avatar_public_id = Some(avatar_public_id.clone());
        }
        user.updated_at = at;
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<(), AuthError> {
        self.sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.get(token_hash).map(|s| s.value().clone()))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), AuthError> {
        self.sessions.remove(token_hash);
        Ok(())
    }
}

#[async_trait]
impl ResetStore for MemoryStore {
    async fn delete_resets_for_user(&self, user_id: &str) -> Result<u64, AuthError> {
        let before = self.resets.len();
        self.resets.retain(|_, r| r.user_id != user_id);
        Ok((before - self.resets.len()) as u64)
    }

    async fn create_reset(&self, reset: &PasswordReset) -> Result<(), AuthError> {
        self.resets.insert(reset.id.clone(), reset.clone());
        Ok(())
    }

    async fn find_unused_reset(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>, AuthError> {
        Ok(self
            .resets
            .iter()
            .find(|r| r.token_hash == token_hash && !r.used)
            .map(|r| r.value().clone()))
    }

    async fn mark_reset_used(&self, reset_id: &str, at: DateTime<Utc>) -> Result<bool, AuthError> {
        let Some(mut reset) = self.resets.get_mut(reset_id) else {
            return Ok(false);
        };
        if reset.used {
            return Ok(false);
        }
        reset.used = true;
        reset.used_at = Some(at);
        Ok(true)
    }

    async fn release_reset(&self, reset_id: &str) -> Result<(), AuthError> {
        if let Some(mut reset) = self.resets.get_mut(reset_id) {
            reset.used = false;
            reset.used_at = None;
        }
        Ok(())
    }
}
