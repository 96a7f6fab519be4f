//! Request, response, and state types for the auth service. Credential and
//! token fields are `SecretString` so they never show up in `Debug` output or
//! logs.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Login form. Transient: built per submit and dropped after the call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Form fields for `application/x-www-form-urlencoded` submission.
    pub(crate) fn form(&self) -> [(&str, &str); 2] {
        [
            ("username", self.username.as_str()),
            ("password", self.password.expose_secret()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl RegistrationRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct RegistrationBody<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a RegistrationRequest> for RegistrationBody<'a> {
    fn from(request: &'a RegistrationRequest) -> Self {
        Self {
            username: &request.username,
            email: &request.email,
            password: request.password.expose_secret(),
        }
    }
}

/// Access/refresh token pair. Both halves are always stored and cleared together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }
}

impl PartialEq for TokenPair {
    fn eq(&self, other: &Self) -> bool {
        self.access_token() == other.access_token() && self.refresh_token() == other.refresh_token()
    }
}

impl Eq for TokenPair {}

/// Authentication state as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { roles: BTreeSet<String> },
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn roles(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { roles } => Some(roles),
        }
    }
}

/// Outcome of a successful registration: the account exists but is not active yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPending {
    pub email: String,
}

/// Body of `/auth/token`, `/auth/verify-otp`, and `/auth/refresh-token`.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct OtpRequest<'a> {
    pub email: &'a str,
}

#[derive(Serialize)]
pub(crate) struct OtpVerification<'a> {
    pub email: &'a str,
    pub otp_code: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body of `GET /auth/validate-token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenValidation {
    #[serde(default)]
    pub message: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("bob", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn token_pair_debug_hides_tokens() {
        let pair = TokenPair::new("access-abc", "refresh-xyz");
        let debug = format!("{pair:?}");
        assert!(!debug.contains("access-abc"));
        assert!(!debug.contains("refresh-xyz"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn registration_body_serializes_plain_fields() {
        let request = RegistrationRequest::new("alice", "a@x.com", "pw");
        let body = serde_json::to_value(RegistrationBody::from(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"username": "alice", "email": "a@x.com", "password": "pw"})
        );
    }

    #[test]
    fn token_response_allows_missing_refresh_token() {
        let response: Result<TokenResponse, _> =
            serde_json::from_str(r#"{"access_token":"a","token_type":"bearer"}"#);
        assert!(response.is_ok_and(|r| r.access_token == "a" && r.refresh_token.is_none()));
    }

    #[test]
    fn session_state_exposes_roles_only_when_authenticated() {
        assert_eq!(SessionState::Anonymous.roles(), None);
        let roles: BTreeSet<String> = ["super_user".to_string()].into();
        let state = SessionState::Authenticated {
            roles: roles.clone(),
        };
        assert!(state.is_authenticated());
        assert_eq!(state.roles(), Some(&roles));
    }
}
