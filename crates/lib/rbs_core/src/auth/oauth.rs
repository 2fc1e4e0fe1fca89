//! Google OAuth sign-in: authorize URL construction.

use url::Url;

use super::AuthError;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Path the provider redirects back to, relative to the app origin.
pub const GOOGLE_CALLBACK_PATH: &str = "/auth/google/callback";

/// OAuth client registration. The client secret is only needed for the
/// code exchange on the callback, which this service does not handle.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
}

impl GoogleOAuthConfig {
    /// Read `GOOGLE_CLIENT_ID`; `None` when unset or blank.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let client_id = lookup("GOOGLE_CLIENT_ID").filter(|v| !v.trim().is_empty())?;
        Some(Self { client_id })
    }
}

/// Build the provider URL the browser is sent to.
pub fn google_authorize_url(
    config: &GoogleOAuthConfig,
    app_origin: &str,
    state: &str,
) -> Result<Url, AuthError> {
    let redirect_uri = format!("{}{GOOGLE_CALLBACK_PATH}", app_origin.trim_end_matches('/'));
    Url::parse_with_params(
        GOOGLE_AUTHORIZE_URL,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state),
            ("prompt", "select_account"),
        ],
    )
    .map_err(|e| AuthError::Internal(format!("oauth url: {e}")))
}
