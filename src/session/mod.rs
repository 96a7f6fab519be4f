//! Client-side authentication session: token storage, claim decoding, remote
//! auth calls, and forced logout. This module touches security boundaries and
//! must never log passwords, OTP codes, or token material.
//!
//! Flow Overview: `register` creates an inactive account, `request_otp` and
//! `activate_account` activate it, `login` stores the token pair, and
//! `authorized_request` attaches it until the API answers 401/403, at which
//! point the pair is cleared and `SessionEvent::AuthorizationLost` is emitted.

mod api;
pub mod claims;
pub mod config;
pub mod error;
pub mod events;
mod manager;
pub mod store;
pub mod types;

pub use claims::{DecodedClaims, SUPER_USER_ROLE};
pub use config::SessionConfig;
pub use error::{DecodeError, Error, StoreError};
pub use events::SessionEvent;
pub use manager::SessionManager;
pub use reqwest::Method;
pub use store::{FileStore, KeyValueStore, MemoryStore, TokenStore};
pub use types::{
    Credentials, RegistrationPending, RegistrationRequest, SessionState, TokenPair,
    TokenValidation,
};
