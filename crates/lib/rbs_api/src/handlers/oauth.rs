//! OAuth sign-in redirect.

use axum::extract::State;
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use rbs_core::auth::oauth::google_authorize_url;
use rbs_core::auth::tokens::generate_oauth_state;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::services::cookies::oauth_state_cookie;

/// `GET /auth/google/redirect`: store a fresh state value in a cookie and
/// send the browser to Google.
pub async fn google_redirect_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<Response> {
    let config = state
        .config
        .google_oauth
        .as_ref()
        .ok_or_else(|| AppError::Configuration("GOOGLE_CLIENT_ID is not set".into()))?;

    let oauth_state = generate_oauth_state();
    let url = google_authorize_url(config, &state.config.app_origin, &oauth_state)?;
    let jar = jar.add(oauth_state_cookie(&oauth_state, state.config.secure_cookies));

    Ok((StatusCode::FOUND, jar, [(LOCATION, url.to_string())]).into_response())
}
