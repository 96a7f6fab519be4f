//! # opal-session
//!
//! Client-side authentication session for the OpalSuite auth service. The
//! crate owns the access/refresh token pair a client holds, talks to the remote
//! `/auth/*` endpoints, decodes the access token claims and enforces global
//! invalidation when the API answers 401 or 403.
//!
//! ## Session Lifecycle
//!
//! 1. **Register:** `POST /auth/register` creates an inactive account. No
//!    session is established; the email is remembered for the activation step.
//! 2. **Activate:** `POST /auth/request-otp` delivers a code and
//!    `POST /auth/activate-account` submits it. The user then logs in.
//! 3. **Login:** `POST /auth/token` (form encoded) returns the token pair. The
//!    pair is persisted and the access token is decoded; an undecodable token
//!    is discarded on the spot.
//! 4. **Use:** authorized calls carry `Authorization: Bearer <access_token>`.
//!    A 401/403 clears the store and emits
//!    [`SessionEvent::AuthorizationLost`](session::SessionEvent).
//! 5. **Logout:** clears the store unconditionally.
//!
//! Nothing in this crate refreshes tokens in the background; `refresh()` is an
//! explicit call.

pub mod cli;
pub mod session;

pub const GIT_COMMIT_HASH: &str = match option_env!("OPAL_SESSION_GIT_SHA") {
    Some(hash) => hash,
    None => "unknown",
};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
