//! Authentication request handlers.

use axum::Json;
use axum::extract::{Extension, State};
use axum_extra::extract::cookie::CookieJar;
use rbs_core::models::auth::{ProfileChanges, SessionInfo};
use tracing::error;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SessionResponse, SuccessResponse,
    UserResponse,
};
use crate::services::cookies::{SESSION_COOKIE, clear_session_cookie, session_cookie};

/// `POST /auth/login`: authenticate with email + password and set the session cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let outcome = state.sessions.login(&body.email, &body.password).await?;
    let jar = jar.add(session_cookie(&outcome.token, state.config.secure_cookies));
    Ok((
        jar,
        Json(SessionResponse {
            user: outcome.user,
            session: outcome.session,
        }),
    ))
}

/// `POST /auth/logout`: end the session behind the cookie, if any.
///
/// Always succeeds and clears the cookie; store failures are only logged.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(e) = state.sessions.logout(cookie.value()).await
    {
        error!(error = %e, "logout failed to delete session");
    }
    let jar = jar.add(clear_session_cookie(state.config.secure_cookies));
    (jar, Json(SuccessResponse::ok()))
}

/// `GET /auth/session`: the signed-in user and their session window.
pub async fn session_handler(
    Extension(AuthenticatedUser(resolved)): Extension<AuthenticatedUser>,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: resolved.user.sanitized(),
        session: SessionInfo::from(&resolved.session),
    })
}

/// `GET /auth/profile`
pub async fn get_profile_handler(
    Extension(AuthenticatedUser(resolved)): Extension<AuthenticatedUser>,
) -> Json<UserResponse> {
    Json(UserResponse {
        user: resolved.user.sanitized(),
    })
}

/// `PUT /auth/profile`: partial update of name, email and contact fields.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(resolved)): Extension<AuthenticatedUser>,
    AppJson(changes): AppJson<ProfileChanges>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .profiles
        .update_profile(&resolved.user.id, changes)
        .await?;
    Ok(Json(UserResponse { user }))
}

/// `POST /auth/forgot-password`: mail a reset link.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.resets.request_reset(&body.email).await?;
    Ok(Json(SuccessResponse::with_message(
        "Password reset email sent",
    )))
}

/// `POST /auth/reset-password`: set a new password with a reset token.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .resets
        .consume_reset(&body.token, &body.password)
        .await?;
    Ok(Json(SuccessResponse::with_message(
        "Password has been reset successfully",
    )))
}
