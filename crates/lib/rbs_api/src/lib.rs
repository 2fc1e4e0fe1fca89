//! # rbs_api
//!
//! HTTP API library for the RBS storefront: auth endpoints, the session
//! middleware and the route authorization gate.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use rbs_core::auth::AuthError;
use rbs_core::auth::jwt::TokenCodec;
use rbs_core::auth::profile::ProfileService;
use rbs_core::auth::reset::PasswordResetFlow;
use rbs_core::auth::sessions::SessionManager;
use rbs_core::clock::Clock;
use rbs_core::mail::Mailer;
use rbs_core::store::{CredentialStore, ResetStore, SessionStore};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{auth, oauth};

/// Route paths.
pub mod routes {
    pub const POST_AUTH_LOGIN: &str = "/auth/login";
    pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
    pub const GET_AUTH_SESSION: &str = "/auth/session";
    pub const AUTH_PROFILE: &str = "/auth/profile";
    pub const POST_AUTH_FORGOT_PASSWORD: &str = "/auth/forgot-password";
    pub const POST_AUTH_RESET_PASSWORD: &str = "/auth/reset-password";
    pub const GET_AUTH_GOOGLE_REDIRECT: &str = "/auth/google/redirect";
}

/// Shared application state passed to all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub resets: PasswordResetFlow,
    pub profiles: ProfileService,
    /// Used by the gate to decode cookies without touching the store.
    pub codec: TokenCodec,
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the auth services over a single store.
    ///
    /// Fails only if the configured signing secret is empty.
    pub fn new<S>(
        config: ApiConfig,
        store: Arc<S>,
        mailer: Option<Arc<dyn Mailer>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError>
    where
        S: CredentialStore + SessionStore + ResetStore + 'static,
    {
        let codec = TokenCodec::new(&config.jwt_secret)?;
        let users: Arc<dyn CredentialStore> = store.clone();
        let sessions: Arc<dyn SessionStore> = store.clone();
        let resets: Arc<dyn ResetStore> = store;

        Ok(Self {
            sessions: SessionManager::new(
                users.clone(),
                sessions,
                codec.clone(),
                clock.clone(),
            ),
            resets: PasswordResetFlow::new(
                users.clone(),
                resets,
                mailer,
                clock.clone(),
                &config.app_origin,
            ),
            profiles: ProfileService::new(users, clock),
            codec,
            config,
        })
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no session required)
    let public = Router::new()
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(
            routes::POST_AUTH_FORGOT_PASSWORD,
            post(auth::forgot_password_handler),
        )
        .route(
            routes::POST_AUTH_RESET_PASSWORD,
            post(auth::reset_password_handler),
        )
        .route(
            routes::GET_AUTH_GOOGLE_REDIRECT,
            get(oauth::google_redirect_handler),
        );

    // Routes resolved against the session store
    let protected = Router::new()
        .route(routes::GET_AUTH_SESSION, get(auth::session_handler))
        .route(
            routes::AUTH_PROFILE,
            get(auth::get_profile_handler).put(auth::update_profile_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gate::authorization_gate,
        ))
        .layer(cors)
        .with_state(state)
}
