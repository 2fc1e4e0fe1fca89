//! Integration tests: drive the router over the in-memory store.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use chrono::Duration;
use rbs_api::config::ApiConfig;
use rbs_api::{AppState, router};
use rbs_core::auth::accounts::create_account;
use rbs_core::auth::oauth::GoogleOAuthConfig;
use rbs_core::clock::ManualClock;
use rbs_core::mail::{MailMessage, Mailer, MockMailer};
use rbs_core::store::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";
const PASSWORD: &str = "correct-horse-battery";

struct Harness {
    state: AppState,
    app: Router,
    clock: Arc<ManualClock>,
    outbox: Arc<Mutex<Vec<MailMessage>>>,
}

fn base_config() -> ApiConfig {
    ApiConfig::from_lookup(|key| (key == "JWT_SECRET").then(|| SECRET.to_string())).unwrap()
}

async fn harness_with(config: ApiConfig, with_mailer: bool) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::starting_now());
    let outbox = Arc::new(Mutex::new(Vec::new()));

    let mailer: Option<Arc<dyn Mailer>> = with_mailer.then(|| {
        let sent = outbox.clone();
        let mut mock = MockMailer::new();
        mock.expect_send().returning(move |msg| {
            sent.lock().unwrap().push(msg.clone());
            Ok(())
        });
        Arc::new(mock) as Arc<dyn Mailer>
    });

    create_account(store.as_ref(), "jane@example.com", "Jane", PASSWORD, false)
        .await
        .unwrap();
    create_account(store.as_ref(), "boss@example.com", "Boss", PASSWORD, true)
        .await
        .unwrap();
    create_account(store.as_ref(), "sam@example.com", "Sam", PASSWORD, false)
        .await
        .unwrap();

    let state = AppState::new(config, store, mailer, clock.clone()).unwrap();
    Harness {
        app: router(state.clone()),
        state,
        clock,
        outbox,
    }
}

async fn harness() -> Harness {
    harness_with(base_config(), true).await
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("rbs_session={token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("rbs_session={token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Log in and return the session cookie value.
    async fn login(&self, email: &str) -> String {
        let resp = self
            .post_json(
                "/auth/login",
                json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        cookie_value(resp.headers(), "rbs_session").expect("session cookie")
    }

    fn last_reset_token(&self) -> String {
        let outbox = self.outbox.lock().unwrap();
        let text = &outbox.last().expect("reset mail").text;
        let start = text.find("token=").expect("token in link") + "token=".len();
        text[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (k, val) = pair.split_once('=')?;
            (k.trim() == name).then(|| val.to_string())
        })
}

fn set_cookie_header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .expect("set-cookie header")
        .to_string()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// -- login / session / logout -----------------------------------------------

#[tokio::test]
async fn login_sets_cookie_and_returns_user() {
    let h = harness().await;
    let resp = h
        .post_json(
            "/auth/login",
            json!({ "email": "Jane@Example.com ", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = set_cookie_header(resp.headers(), "rbs_session");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));

    let body = json_body(resp).await;
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["session"]["expiresAt"].is_string());
}

#[tokio::test]
async fn login_rejections() {
    let h = harness().await;

    let resp = h
        .post_json("/auth/login", json!({ "email": "jane@example.com" }), None)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let wrong = h
        .post_json(
            "/auth/login",
            json!({ "email": "jane@example.com", "password": "nope-nope-nope" }),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let unknown = h
        .post_json(
            "/auth/login",
            json!({ "email": "ghost@example.com", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong).await, json_body(unknown).await);
}

#[tokio::test]
async fn malformed_bodies_get_the_json_error_shape() {
    let h = harness().await;

    let broken = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let resp = h.send(broken).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "validation_error");

    let mistyped = h
        .post_json("/auth/login", json!({ "email": 42, "password": true }), None)
        .await;
    assert_eq!(mistyped.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(mistyped).await["error"], "validation_error");

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/auth/forgot-password")
        .body(Body::from("{}"))
        .unwrap();
    let resp = h.send(no_content_type).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["message"].is_string());
}

#[tokio::test]
async fn session_requires_live_session() {
    let h = harness().await;
    assert_eq!(
        h.get("/auth/session", None).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let token = h.login("jane@example.com").await;
    let resp = h.get("/auth/session", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["user"]["name"], "Jane");

    let resp = h.post_json("/auth/logout", json!({}), Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = set_cookie_header(resp.headers(), "rbs_session");
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(json_body(resp).await["success"], true);

    // Signature and expiry are still fine; the session row is gone.
    assert!(h.state.codec.verify(&token).is_some());
    assert_eq!(
        h.get("/auth/session", Some(&token)).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn logout_without_cookie_still_succeeds() {
    let h = harness().await;
    let resp = h.post_json("/auth/logout", json!({}), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = h.post_json("/auth/logout", json!({}), Some("garbage")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let h = harness().await;
    let token = h.login("jane@example.com").await;
    h.clock.advance(Duration::days(7) + Duration::seconds(1));
    assert_eq!(
        h.get("/auth/session", Some(&token)).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

// -- profile ----------------------------------------------------------------

#[tokio::test]
async fn profile_read_and_update() {
    let h = harness().await;
    let token = h.login("jane@example.com").await;

    let resp = h.get("/auth/profile", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["user"]["email"], "jane@example.com");

    let put = |body: Value| {
        Request::builder()
            .method("PUT")
            .uri("/auth/profile")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("rbs_session={token}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let resp = h.send(put(json!({ "name": "Jane Q", "phone": "555-0100" }))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["user"]["name"], "Jane Q");
    assert_eq!(body["user"]["phone"], "555-0100");

    let resp = h.send(put(json!({ "email": "SAM@example.com" }))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = h.send(put(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_session() {
    let h = harness().await;
    assert_eq!(
        h.get("/auth/profile", None).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

// -- password reset ---------------------------------------------------------

#[tokio::test]
async fn forgot_then_reset_password() {
    let h = harness().await;
    let resp = h
        .post_json(
            "/auth/forgot-password",
            json!({ "email": "Jane@example.com" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["success"], true);

    let token = h.last_reset_token();
    let resp = h
        .post_json(
            "/auth/reset-password",
            json!({ "token": token, "password": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .post_json(
            "/auth/login",
            json!({ "email": "jane@example.com", "password": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let again = h
        .post_json(
            "/auth/reset-password",
            json!({ "token": token, "password": "another-password" }),
            None,
        )
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_password_errors() {
    let h = harness().await;
    let resp = h
        .post_json("/auth/forgot-password", json!({ "email": "nope" }), None)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = h
        .post_json(
            "/auth/forgot-password",
            json!({ "email": "ghost@example.com" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let unconfigured = harness_with(base_config(), false).await;
    let resp = unconfigured
        .post_json(
            "/auth/forgot-password",
            json!({ "email": "jane@example.com" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn expired_reset_token_is_gone() {
    let h = harness().await;
    h.post_json(
        "/auth/forgot-password",
        json!({ "email": "jane@example.com" }),
        None,
    )
    .await;
    let token = h.last_reset_token();
    h.clock.advance(Duration::hours(1) + Duration::seconds(1));

    let resp = h
        .post_json(
            "/auth/reset-password",
            json!({ "token": token, "password": "brand-new-password" }),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(json_body(resp).await["error"], "expired");
}

// -- gate -------------------------------------------------------------------

#[tokio::test]
async fn admin_paths_redirect_by_identity() {
    let h = harness().await;

    let resp = h.get("/admin/orders", None).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/login?redirect=%2Fadmin%2Forders");

    let customer = h.login("jane@example.com").await;
    let resp = h.get("/admin/orders", Some(&customer)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/");

    let admin = h.login("boss@example.com").await;
    let resp = h.get("/admin/orders", Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_and_guest_only_pages() {
    let h = harness().await;
    let resp = h.get("/checkout", None).await;
    assert_eq!(location(&resp), "/login?redirect=%2Fcheckout");

    assert_eq!(h.get("/login", None).await.status(), StatusCode::NOT_FOUND);

    let token = h.login("jane@example.com").await;
    let resp = h.get("/login", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
async fn tampered_cookie_counts_as_anonymous() {
    let h = harness().await;
    let token = h.login("jane@example.com").await;
    let resp = h.get("/orders", Some(&format!("{token}x"))).await;
    assert_eq!(location(&resp), "/login?redirect=%2Forders");
}

#[tokio::test]
async fn gate_strips_spoofed_headers_and_injects_identity() {
    let h = harness().await;

    async fn echo(headers: HeaderMap) -> String {
        headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string()
    }

    let app = Router::new()
        .route("/echo", get(echo))
        .route("/static/echo", get(echo))
        .layer(axum::middleware::from_fn_with_state(
            h.state.clone(),
            rbs_api::middleware::gate::authorization_gate,
        ))
        .with_state(h.state.clone());

    let spoofed = Request::builder()
        .uri("/echo")
        .header("x-user-id", "someone-else")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(spoofed).await.unwrap();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"none");

    // Excluded static paths skip classification but are still scrubbed.
    let spoofed_static = Request::builder()
        .uri("/static/echo")
        .header("x-user-id", "someone-else")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(spoofed_static).await.unwrap();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"none");

    let token = h.login("jane@example.com").await;
    let claims = h.state.codec.verify(&token).unwrap();
    let signed_in = Request::builder()
        .uri("/echo")
        .header("x-user-id", "someone-else")
        .header(header::COOKIE, format!("rbs_session={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(signed_in).await.unwrap();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], claims.sub.as_bytes());
}

#[tokio::test]
async fn static_assets_skip_the_gate() {
    let h = harness().await;
    let token = h.login("jane@example.com").await;
    // Would be guest-only redirect territory if not excluded.
    let resp = h.get("/static/login", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// -- oauth ------------------------------------------------------------------

#[tokio::test]
async fn google_redirect_sets_state_cookie() {
    let mut config = base_config();
    config.google_oauth = Some(GoogleOAuthConfig {
        client_id: "client-123".into(),
    });
    let h = harness_with(config, true).await;

    let resp = h.get("/auth/google/redirect", None).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let state = cookie_value(resp.headers(), "rbs_oauth_state").expect("state cookie");
    assert_eq!(state.len(), 32);
    let target = location(&resp);
    assert!(target.starts_with("https://accounts.google.com/"));
    assert!(target.contains(&format!("state={state}")));
    assert!(set_cookie_header(resp.headers(), "rbs_oauth_state").contains("Max-Age=600"));
}

#[tokio::test]
async fn google_redirect_without_client_is_500() {
    let h = harness().await;
    let resp = h.get("/auth/google/redirect", None).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["error"], "configuration_error");
}
