//! Outbound mail for password reset links.
//!
//! Delivery goes through a transactional mail relay's HTTP API. The relay
//! credentials are optional at startup; flows that need mail fail with a
//! configuration error when they are absent.

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use tracing::{debug, error};

use crate::auth::AuthError;

/// A single outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), AuthError>;
}

/// Mail relay settings.
#[derive(Clone)]
pub struct MailConfig {
    /// Relay endpoint accepting a JSON message via POST.
    pub api_url: String,
    pub api_key: String,
    /// Sender address.
    pub from: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl MailConfig {
    /// Read `MAIL_API_URL`, `MAIL_API_KEY` and `MAIL_FROM`.
    ///
    /// Returns `None` unless all three are set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            api_url: get("MAIL_API_URL")?,
            api_key: get("MAIL_API_KEY")?,
            from: get("MAIL_FROM")?,
        })
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// [`Mailer`] that posts to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AuthError> {
        let payload = RelayPayload {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };
        let resp = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AuthError::MailError(format!("relay request: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(%status, body = %body, "mail relay rejected message");
            return Err(AuthError::MailError(format!("relay returned {status}")));
        }
        debug!(to = %message.to, "mail relay accepted message");
        Ok(())
    }
}

/// Build the password reset email for `link`.
pub fn reset_message(to: &str, name: &str, link: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        text: format!(
            "Hi {name},\n\n\
             We received a request to reset your password. Open the link below \
             within one hour to choose a new one:\n\n{link}\n\n\
             If you did not ask for this, you can ignore this email."
        ),
        html: format!(
            "<p>Hi {name},</p>\
             <p>We received a request to reset your password. The link below is \
             valid for one hour.</p>\
             <p><a href=\"{link}\">Reset password</a></p>\
             <p>If you did not ask for this, you can ignore this email.</p>"
        ),
    }
}
