//! Authentication and authorization logic.
//!
//! Provides password hashing, token signing, session lifecycle, the password
//! reset flow and profile updates, shared by `rbs_api` and the server binary.

pub mod accounts;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod profile;
pub mod reset;
pub mod sessions;
pub mod tokens;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Account is disabled")]
    AccountDisabled,

    /// No live session behind the presented token.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid or already used reset token")]
    InvalidResetToken,

    #[error("Reset token has expired")]
    ResetTokenExpired,

    /// A required secret or credential is missing. Not retryable.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Mail delivery error: {0}")]
    MailError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Canonical identity form of an email: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Cheap shape check for an already-normalized email.
pub fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
