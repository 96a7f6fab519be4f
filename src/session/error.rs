use thiserror::Error;

/// Sentinel detail the auth service returns when the account still needs OTP activation.
pub const ACCOUNT_NOT_ACTIVE: &str = "Account is not active. Please activate your account via OTP.";

/// Message attached to every forced logout.
pub const AUTHORIZATION_LOST: &str = "Unauthorized or Forbidden. Please log in again.";

/// Failures surfaced by the session manager.
///
/// Variants carrying a `message` display it verbatim so callers can render the
/// server text without rewording it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to reach the server: {0}")]
    Network(String),
    #[error("Request timed out. Please try again.")]
    Timeout,
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },
    #[error("{message}")]
    Auth { message: String },
    #[error("{message}")]
    ActivationRequired { message: String },
    #[error("{message}")]
    Registration { message: String },
    #[error("{message}")]
    OtpRequest { message: String },
    #[error("{message}")]
    Activation { message: String },
    #[error("invalid access token: {0}")]
    Decode(#[from] DecodeError),
    #[error("Unauthorized or Forbidden. Please log in again.")]
    AuthorizationLost { status: u16 },
    #[error("Failed to decode response: {0}")]
    Parse(String),
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures after which the local token pair has been discarded.
    #[must_use]
    pub fn cleared_session(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::AuthorizationLost { .. })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("missing roles claim")]
    MissingRoles,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store contents: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}
