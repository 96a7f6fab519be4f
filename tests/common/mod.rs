#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! In-process mock of the OpalSuite auth service.

use axum::{
    extract::Json,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use opal_session::session::{MemoryStore, SessionConfig, SessionManager};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

pub const ACCOUNT_NOT_ACTIVE: &str = "Account is not active. Please activate your account via OTP.";
pub const VALID_OTP: &str = "123456";
pub const REFRESH_TOKEN: &str = "refresh-good";
pub const ROTATED_REFRESH_TOKEN: &str = "refresh-rotated";

/// Rejection detail well past a typical banner length.
pub fn verbose_detail() -> String {
    format!(
        "Login failed: {} Contact support@opal.dev if this persists.",
        "your organisation requires single sign-on for this account. ".repeat(4)
    )
}

/// Unsigned compact JWT around `payload`.
pub fn jwt(payload: &Value) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = Base64UrlUnpadded::encode_string(payload.to_string().as_bytes());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

pub fn access_token(subject: &str, roles: &[&str]) -> String {
    jwt(&json!({"sub": subject, "roles": roles, "exp": 4_102_444_800_i64}))
}

fn bob_token() -> String {
    access_token("bob", &["user"])
}

fn admin_token() -> String {
    access_token("root", &["super_user", "user"])
}

fn tokens(access: String, refresh: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "access_token": access,
            "token_type": "bearer",
            "refresh_token": refresh,
        })),
    )
        .into_response()
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn is_known_token(token: Option<&str>) -> bool {
    token.is_some_and(|t| t == bob_token() || t == admin_token())
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn token(Form(form): Form<LoginForm>) -> Response {
    match (form.username.as_str(), form.password.as_str()) {
        ("bob", "right") => tokens(bob_token(), REFRESH_TOKEN),
        ("root", "right") => tokens(admin_token(), REFRESH_TOKEN),
        ("pending", _) => detail(StatusCode::FORBIDDEN, ACCOUNT_NOT_ACTIVE),
        ("mangled", _) => tokens("not-a-jwt".to_string(), REFRESH_TOKEN),
        ("roleless", _) => tokens(jwt(&json!({"sub": "roleless"})), REFRESH_TOKEN),
        ("terse", _) => (StatusCode::UNAUTHORIZED, "nope").into_response(),
        ("verbose", _) => detail(StatusCode::UNAUTHORIZED, &verbose_detail()),
        _ => detail(StatusCode::UNAUTHORIZED, "Login failed"),
    }
}

#[derive(Deserialize)]
struct Registration {
    username: String,
    email: String,
    password: String,
}

async fn register(Json(body): Json<Registration>) -> Response {
    if body.username == "taken" {
        return detail(StatusCode::BAD_REQUEST, "Username already registered");
    }
    if body.password.is_empty() || body.email.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "password"], "msg": "field required"}]})),
        )
            .into_response();
    }
    if body.username == "eager" {
        // Issues a token anyway; the client must ignore it.
        return (
            StatusCode::CREATED,
            Json(json!({"access_token": access_token("eager", &["user"]), "token_type": "bearer"})),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({"message": "User registered"}))).into_response()
}

#[derive(Deserialize)]
struct OtpRequest {
    email: String,
}

async fn request_otp(Json(body): Json<OtpRequest>) -> Response {
    if body.email.ends_with("@x.com") {
        (StatusCode::OK, Json(json!({"message": "OTP sent to email."}))).into_response()
    } else {
        detail(StatusCode::NOT_FOUND, "User with this email not found")
    }
}

#[derive(Deserialize)]
struct OtpVerification {
    email: String,
    otp_code: String,
}

async fn activate_account(Json(body): Json<OtpVerification>) -> Response {
    if body.otp_code == VALID_OTP && body.email.ends_with("@x.com") {
        (StatusCode::OK, Json(json!({"message": "Account activated"}))).into_response()
    } else {
        detail(StatusCode::BAD_REQUEST, "Invalid or expired OTP")
    }
}

async fn verify_otp(Json(body): Json<OtpVerification>) -> Response {
    if body.otp_code == VALID_OTP {
        tokens(bob_token(), REFRESH_TOKEN)
    } else {
        detail(StatusCode::UNAUTHORIZED, "Invalid or expired OTP")
    }
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh_token(Json(body): Json<RefreshRequest>) -> Response {
    if body.refresh_token == REFRESH_TOKEN {
        tokens(admin_token(), ROTATED_REFRESH_TOKEN)
    } else {
        detail(StatusCode::UNAUTHORIZED, "Refresh token expired or invalid")
    }
}

async fn validate_token(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(t) if t == bob_token() => (
            StatusCode::OK,
            Json(json!({"message": "Token is valid", "username": "bob", "roles": ["user"]})),
        )
            .into_response(),
        Some(t) if t == admin_token() => (
            StatusCode::OK,
            Json(json!({"message": "Token is valid", "username": "root", "roles": ["super_user", "user"]})),
        )
            .into_response(),
        _ => detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"),
    }
}

async fn protected(headers: HeaderMap) -> Response {
    if is_known_token(bearer(&headers)) {
        (StatusCode::OK, Json(json!({"data": 1}))).into_response()
    } else {
        detail(StatusCode::UNAUTHORIZED, "Not authenticated")
    }
}

async fn echo(headers: HeaderMap, body: Option<Json<Value>>) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };
    Json(json!({
        "authorization": header_value(header::AUTHORIZATION),
        "content_type": header_value(header::CONTENT_TYPE),
        "body": body.map(|Json(value)| value),
    }))
    .into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({"late": true})).into_response()
}

pub fn router() -> Router {
    Router::new()
        .route("/auth/token", post(token))
        .route("/auth/register", post(register))
        .route("/auth/request-otp", post(request_otp))
        .route("/auth/activate-account", post(activate_account))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/validate-token", get(validate_token))
        .route("/api/protected", get(protected))
        .route("/api/admin", get(|| async { StatusCode::FORBIDDEN }))
        .route("/api/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/api/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/api/empty", post(|| async { StatusCode::NO_CONTENT }))
        .route("/api/text", get(|| async { "plain text" }))
        .route("/api/echo", get(echo).post(echo))
        .route("/api/slow", get(slow))
}

/// Serves the mock on an ephemeral port and returns its base URL.
pub async fn spawn_auth_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock auth service");
    let addr = listener.local_addr().expect("no local address");
    tokio::spawn(async move {
        axum::serve(listener, router().into_make_service())
            .await
            .expect("mock auth service failed");
    });
    format!("http://{addr}")
}

/// Base URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn manager(base_url: &str, store: &MemoryStore) -> SessionManager {
    let config = SessionConfig::new(base_url).unwrap();
    SessionManager::new(&config, Arc::new(store.clone())).unwrap()
}
