//! Session middleware: resolves the session cookie against the session store.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use rbs_core::auth::sessions::ResolvedSession;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// Live session attached to requests that passed `require_session`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub ResolvedSession);

/// Axum middleware: reads the `rbs_session` cookie, resolves it to a live
/// session and injects `AuthenticatedUser` into request extensions.
///
/// Unlike the gate this consults the store, so a logged-out token is
/// rejected here even while its signature is still valid.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    let resolved = state
        .sessions
        .resolve(&token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    request.extensions_mut().insert(AuthenticatedUser(resolved));

    Ok(next.run(request).await)
}
