//! Connection settings for the remote auth service. The only required value is
//! the base URL; the timeout belongs to the HTTP transport, not to the session
//! logic. Configuration values are public; do not store secrets here.

use super::error::Error;
use std::time::Duration;
use url::Url;

/// Default request timeout applied by the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl SessionConfig {
    /// # Errors
    /// Returns `Error::Config` if `base_url` is empty or not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            base_url,
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: crate::APP_USER_AGENT.to_string(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_base_url(raw: &str) -> Result<String, Error> {
    let value =
        normalize_value(raw).ok_or_else(|| Error::Config("base URL is empty".to_string()))?;
    let url = Url::parse(&value).map_err(|err| Error::Config(format!("invalid base URL: {err}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::Config(format!(
                "invalid base URL: unsupported scheme {scheme}"
            )))
        }
    }
    if url.host().is_none() {
        return Err(Error::Config(
            "invalid base URL: no host specified".to_string(),
        ));
    }

    Ok(value.trim_end_matches('/').to_string())
}
