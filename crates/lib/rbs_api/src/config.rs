//! API server configuration.

use std::fmt;

use rbs_core::auth::jwt::resolve_jwt_secret;
use rbs_core::auth::oauth::GoogleOAuthConfig;
use rbs_core::mail::MailConfig;
use thiserror::Error;

use crate::middleware::gate::RouteTable;

/// Startup configuration errors. These stop the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Public origin used in emailed links and OAuth callbacks.
    pub app_origin: String,
    /// Mark cookies `Secure` (production).
    pub secure_cookies: bool,
    /// Mail relay; password reset requests fail with 500 without it.
    pub mail: Option<MailConfig>,
    /// Google OAuth client; the redirect endpoint fails with 500 without it.
    pub google_oauth: Option<GoogleOAuthConfig>,
    /// Route classes enforced by the authorization gate.
    pub routes: RouteTable,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("app_origin", &self.app_origin)
            .field("secure_cookies", &self.secure_cookies)
            .field("mail", &self.mail)
            .field("google_oauth", &self.google_oauth)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                         |
    /// |------------------------------|---------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3100`                |
    /// | `JWT_SECRET` / `AUTH_SECRET` | required                        |
    /// | `APP_ORIGIN`                 | `http://localhost:3000`         |
    /// | `APP_ENV`                    | `development`                   |
    /// | `MAIL_API_URL` / `MAIL_API_KEY` / `MAIL_FROM` | unset          |
    /// | `GOOGLE_CLIENT_ID`                            | unset          |
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let mut config = Self::from_lookup(lookup)?;
        config.mail = MailConfig::from_env();
        config.google_oauth = GoogleOAuthConfig::from_env();
        Ok(config)
    }

    /// Core settings from an arbitrary key lookup. Mail and OAuth are left unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = resolve_jwt_secret(&lookup)
            .map_err(|_| ConfigError::Missing("JWT_SECRET or AUTH_SECRET".into()))?;
        let production = lookup("APP_ENV").is_some_and(|env| env == "production");
        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3100".into()),
            jwt_secret,
            app_origin: lookup("APP_ORIGIN").unwrap_or_else(|| "http://localhost:3000".into()),
            secure_cookies: production,
            mail: None,
            google_oauth: None,
            routes: RouteTable::default(),
        })
    }
}
