//! Opaque token generation and at-rest hashing.
//!
//! Session tokens and reset tokens use different alphabets and lengths so one
//! can never be mistaken for the other.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};

/// Random bytes behind a session token (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Length of a password reset token, in alphanumeric characters.
pub const RESET_TOKEN_LEN: usize = 40;

/// Length of an OAuth anti-forgery state value.
pub const OAUTH_STATE_LEN: usize = 32;

/// Generate a session token: 32 CSPRNG bytes, base64url without padding.
pub fn generate_session_token() -> String {
    let bytes: [u8; SESSION_TOKEN_BYTES] = rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a password reset token (40 alphanumeric chars).
pub fn generate_reset_token() -> String {
    alphanumeric(RESET_TOKEN_LEN)
}

/// Generate an OAuth `state` value (32 alphanumeric chars).
pub fn generate_oauth_state() -> String {
    alphanumeric(OAUTH_STATE_LEN)
}

fn alphanumeric(len: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
