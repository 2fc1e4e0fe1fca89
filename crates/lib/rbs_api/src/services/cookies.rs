//! Cookie service: build and clear the httpOnly session and OAuth state cookies.

use axum_extra::extract::cookie::{Cookie, SameSite};
use rbs_core::auth::sessions::SESSION_TTL_SECS;
use time::Duration;

/// Cookie carrying the signed auth token.
pub const SESSION_COOKIE: &str = "rbs_session";
/// Cookie carrying the OAuth anti-forgery state.
pub const OAUTH_STATE_COOKIE: &str = "rbs_oauth_state";

const OAUTH_STATE_TTL_MINUTES: i64 = 10;

fn base_cookie(name: &'static str, value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Session cookie, valid for the session lifetime.
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    base_cookie(
        SESSION_COOKIE,
        token.to_string(),
        secure,
        Duration::seconds(SESSION_TTL_SECS),
    )
}

/// Expired session cookie that makes the browser drop it.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    base_cookie(SESSION_COOKIE, String::new(), secure, Duration::ZERO)
}

/// Short-lived OAuth state cookie.
pub fn oauth_state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    base_cookie(
        OAUTH_STATE_COOKIE,
        state.to_string(),
        secure,
        Duration::minutes(OAUTH_STATE_TTL_MINUTES),
    )
}
