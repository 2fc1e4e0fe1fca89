//! Route authorization gate.
//!
//! Runs in front of every handler. Classifies the request path, decodes the
//! session cookie with the token codec only (no store round-trip) and either
//! redirects or lets the request through. A token whose session was revoked
//! elsewhere keeps passing here until it expires; handlers that need the live
//! user resolve it against the session store.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use rbs_core::models::auth::AuthClaims;
use tracing::debug;
use url::form_urlencoded;

use crate::AppState;
use crate::services::cookies::SESSION_COOKIE;

/// Header carrying the signed-in user's id to downstream handlers.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the signed-in user's email to downstream handlers.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

const USER_HEADER_PREFIX: &str = "x-user-";

/// Access class of a route. Paths with no class are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Requires a signed-in user.
    Protected,
    /// Requires a signed-in admin.
    Admin,
    /// Only for visitors; signed-in users are sent home.
    GuestOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    /// Matches the path itself and anything below it, on segment boundaries:
    /// `/admin` matches `/admin/users` but not `/administrator`.
    Prefix(String),
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Exact(p) => path == p,
            RoutePattern::Prefix(p) => prefix_matches(p, path),
        }
    }

    fn specificity(&self) -> usize {
        match self {
            RoutePattern::Exact(p) | RoutePattern::Prefix(p) => p.len(),
        }
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub pattern: RoutePattern,
    pub class: RouteClass,
}

impl RouteRule {
    pub fn prefix(path: &str, class: RouteClass) -> Self {
        Self {
            pattern: RoutePattern::Prefix(path.to_string()),
            class,
        }
    }

    pub fn exact(path: &str, class: RouteClass) -> Self {
        Self {
            pattern: RoutePattern::Exact(path.to_string()),
            class,
        }
    }
}

/// Route classification table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    /// Prefixes that skip the gate entirely (static assets).
    excluded: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        use RouteClass::*;
        Self::new(
            vec![
                RouteRule::prefix("/profile", Protected),
                RouteRule::prefix("/orders", Protected),
                RouteRule::prefix("/checkout", Protected),
                RouteRule::prefix("/wishlist", Protected),
                RouteRule::prefix("/admin", Admin),
                RouteRule::exact("/login", GuestOnly),
                RouteRule::exact("/register", GuestOnly),
                RouteRule::exact("/forgot-password", GuestOnly),
                RouteRule::exact("/reset-password", GuestOnly),
            ],
            vec!["/static".into(), "/assets".into(), "/favicon.ico".into()],
        )
    }
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>, excluded: Vec<String>) -> Self {
        Self { rules, excluded }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.iter().any(|p| prefix_matches(p, path))
    }

    /// Class of the longest matching pattern. On equal length an exact
    /// pattern beats a prefix.
    pub fn classify(&self, path: &str) -> Option<RouteClass> {
        self.rules
            .iter()
            .filter(|rule| rule.pattern.matches(path))
            .max_by_key(|rule| {
                (
                    rule.pattern.specificity(),
                    matches!(rule.pattern, RoutePattern::Exact(_)),
                )
            })
            .map(|rule| rule.class)
    }
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Send to the login page, remembering where the user was going.
    RedirectToLogin,
    RedirectHome,
}

/// Decision table, first match wins.
pub fn decide(class: Option<RouteClass>, claims: Option<&AuthClaims>) -> GateDecision {
    match (class, claims) {
        (Some(RouteClass::Protected | RouteClass::Admin), None) => GateDecision::RedirectToLogin,
        (Some(RouteClass::Admin), Some(c)) if !c.has_admin_access() => GateDecision::RedirectHome,
        (Some(RouteClass::GuestOnly), Some(_)) => GateDecision::RedirectHome,
        _ => GateDecision::Allow,
    }
}

/// `/login?redirect=<path>` with the path form-urlencoded.
pub fn login_redirect(path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", path)
        .finish();
    format!("/login?{query}")
}

/// Drop any client-supplied `x-user-*` headers.
fn strip_user_headers(headers: &mut HeaderMap) {
    let spoofed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with(USER_HEADER_PREFIX))
        .cloned()
        .collect();
    for name in spoofed {
        headers.remove(&name);
    }
}

fn insert_user_headers(headers: &mut HeaderMap, claims: &AuthClaims) {
    if let Ok(value) = HeaderValue::from_str(&claims.sub) {
        headers.insert(USER_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&claims.email) {
        headers.insert(USER_EMAIL_HEADER, value);
    }
}

/// Axum middleware applying the route table to every request.
///
/// On allow with a valid token, the decoded `AuthClaims` are added as a
/// request extension and mirrored into the `x-user-*` headers.
pub async fn authorization_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    strip_user_headers(request.headers_mut());

    let path = request.uri().path().to_string();
    if state.config.routes.is_excluded(&path) {
        return next.run(request).await;
    }

    let claims = CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.codec.verify(cookie.value()));

    let class = state.config.routes.classify(&path);
    match decide(class, claims.as_ref()) {
        GateDecision::RedirectToLogin => {
            debug!(path = %path, "gate: sign-in required");
            Redirect::temporary(&login_redirect(&path)).into_response()
        }
        GateDecision::RedirectHome => {
            debug!(path = %path, "gate: redirecting home");
            Redirect::temporary("/").into_response()
        }
        GateDecision::Allow => {
            if let Some(claims) = claims {
                insert_user_headers(request.headers_mut(), &claims);
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(is_admin: bool) -> AuthClaims {
        AuthClaims {
            sub: "u1".into(),
            email: "jane@example.com".into(),
            name: "Jane".into(),
            role: if is_admin { "admin" } else { "customer" }.into(),
            is_admin,
            session_token: "t".into(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn prefix_is_segment_aware() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/admin"), Some(RouteClass::Admin));
        assert_eq!(table.classify("/admin/users/7"), Some(RouteClass::Admin));
        assert_eq!(table.classify("/administrator"), None);
        assert_eq!(table.classify("/profile/"), Some(RouteClass::Protected));
        assert_eq!(table.classify("/"), None);
        assert_eq!(table.classify("/products/42"), None);
    }

    #[test]
    fn exact_patterns_do_not_match_children() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/login"), Some(RouteClass::GuestOnly));
        assert_eq!(table.classify("/login/help"), None);
    }

    #[test]
    fn longest_match_wins() {
        let table = RouteTable::new(
            vec![
                RouteRule::prefix("/account", RouteClass::Protected),
                RouteRule::exact("/account/signup", RouteClass::GuestOnly),
                RouteRule::prefix("/account/admin", RouteClass::Admin),
            ],
            vec![],
        );
        assert_eq!(table.classify("/account/orders"), Some(RouteClass::Protected));
        assert_eq!(table.classify("/account/signup"), Some(RouteClass::GuestOnly));
        assert_eq!(table.classify("/account/admin/x"), Some(RouteClass::Admin));
    }

    #[test]
    fn static_assets_are_excluded() {
        let table = RouteTable::default();
        assert!(table.is_excluded("/static/app.js"));
        assert!(table.is_excluded("/favicon.ico"));
        assert!(!table.is_excluded("/statics"));
        assert!(!table.is_excluded("/admin"));
    }

    #[test]
    fn decision_table() {
        use GateDecision::*;
        use RouteClass::*;
        let user = claims(false);
        let admin = claims(true);

        assert_eq!(decide(Some(Protected), None), RedirectToLogin);
        assert_eq!(decide(Some(Admin), None), RedirectToLogin);
        assert_eq!(decide(Some(Admin), Some(&user)), RedirectHome);
        assert_eq!(decide(Some(Admin), Some(&admin)), Allow);
        assert_eq!(decide(Some(GuestOnly), Some(&user)), RedirectHome);
        assert_eq!(decide(Some(GuestOnly), None), Allow);
        assert_eq!(decide(Some(Protected), Some(&user)), Allow);
        assert_eq!(decide(None, None), Allow);
    }

    #[test]
    fn role_alone_grants_admin() {
        let mut c = claims(false);
        c.role = "admin".into();
        assert_eq!(decide(Some(RouteClass::Admin), Some(&c)), GateDecision::Allow);
    }

    #[test]
    fn login_redirect_encodes_path() {
        assert_eq!(
            login_redirect("/admin/orders"),
            "/login?redirect=%2Fadmin%2Forders"
        );
    }

    #[test]
    fn spoofed_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("evil"));
        headers.insert("x-user-role", HeaderValue::from_static("admin"));
        headers.insert("accept", HeaderValue::from_static("*/*"));
        strip_user_headers(&mut headers);
        assert!(headers.get("x-user-id").is_none());
        assert!(headers.get("x-user-role").is_none());
        assert!(headers.get("accept").is_some());
    }
}
