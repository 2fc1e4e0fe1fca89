//! Operator-side account provisioning.

use tracing::info;

use super::password::{hash_password, validate_new_password};
use super::{AuthError, is_plausible_email, normalize_email};
use crate::models::auth::{ADMIN_ROLE, DEFAULT_ROLE, NewUser, PublicUser};
use crate::store::CredentialStore;

/// Create an account with a bcrypt-hashed password.
///
/// `admin` grants both the admin role and the admin flag.
pub async fn create_account(
    users: &dyn CredentialStore,
    email: &str,
    name: &str,
    password: &str,
    admin: bool,
) -> Result<PublicUser, AuthError> {
    let email = normalize_email(email);
    if !is_plausible_email(&email) {
        return Err(AuthError::ValidationError(
            "A valid email address is required".into(),
        ));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::ValidationError("Name cannot be empty".into()));
    }
    validate_new_password(password)?;

    let role = if admin { ADMIN_ROLE } else { DEFAULT_ROLE };
    let user = users
        .create_user(NewUser {
            email,
            name: name.to_string(),
            password_hash: hash_password(password)?,
            role: role.to_string(),
            is_admin: admin,
        })
        .await?;

    info!(user_id = %user.id, role, "account created");
    Ok(user.sanitized())
}
