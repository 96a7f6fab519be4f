//! Unverified decoding of the access token payload.
//!
//! The client never holds the signing key, so the signature is not checked
//! here; the API does that on every call. Decoding only has to prove the token
//! is structurally a JWT whose payload carries a `roles` array.

use super::error::DecodeError;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Role that unlocks user management for operators.
pub const SUPER_USER_ROLE: &str = "super_user";

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Read-only view of the access token claims. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClaims {
    pub subject: Option<String>,
    pub roles: BTreeSet<String>,
    /// Expiry as unix seconds.
    pub expiry: Option<i64>,
}

impl DecodedClaims {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    #[must_use]
    pub fn is_super_user(&self) -> bool {
        self.has_role(SUPER_USER_ROLE)
    }

    #[must_use]
    pub fn is_expired(&self, now_unix_seconds: i64) -> bool {
        self.expiry.is_some_and(|exp| exp <= now_unix_seconds)
    }
}

/// Decode the payload segment of a compact JWT.
///
/// # Errors
///
/// Returns an error if the token does not have three segments, the payload is
/// not base64url JSON, or the payload has no `roles` array.
pub fn decode(token: &str) -> Result<DecodedClaims, DecodeError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::TokenFormat);
    };
    if header.is_empty() || payload.is_empty() {
        return Err(DecodeError::TokenFormat);
    }

    // Some issuers pad base64url; tolerate it.
    let payload = payload.trim_end_matches('=');
    let bytes = Base64UrlUnpadded::decode_vec(payload).map_err(|_| DecodeError::Base64)?;
    let raw: RawClaims = serde_json::from_slice(&bytes)?;

    let roles = raw.roles.ok_or(DecodeError::MissingRoles)?;

    Ok(DecodedClaims {
        subject: raw.sub,
        roles: roles.into_iter().collect(),
        expiry: raw.exp,
    })
}
