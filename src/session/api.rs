//! HTTP helpers for the auth service. Every call goes through one
//! `reqwest::Client` so the timeout and user agent are applied uniformly. The
//! helpers never log request bodies; credentials and tokens only travel in the
//! payload or the `Authorization` header.

use super::{config::SessionConfig, error::Error};
use reqwest::{header, Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub(crate) fn new(config: &SessionConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
        })
    }

    /// Resolves `path` against the base URL; absolute URLs pass through.
    pub(crate) fn url(&self, path: &str) -> String {
        build_url_with_base(&self.base_url, path)
    }

    /// Posts `application/x-www-form-urlencoded` fields.
    pub(crate) async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, Error> {
        let url = self.url(path);
        let span = info_span!("auth.request", http.method = "POST", url = %url);
        self.http
            .post(&url)
            .form(form)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)
    }

    /// Posts a JSON body.
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, Error> {
        let url = self.url(path);
        let span = info_span!("auth.request", http.method = "POST", url = %url);
        self.http
            .post(&url)
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)
    }

    /// Sends an arbitrary request with JSON headers and an optional bearer token.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<Response, Error> {
        let url = self.url(path);
        let span = info_span!(
            "auth.authorized_request",
            http.method = %method.as_str(),
            url = %url,
            authenticated = bearer.is_some()
        );

        let mut builder = self
            .http
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Maps transport failures into `Timeout` or `Network`.
fn map_request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(err.to_string())
    }
}

/// Parses a JSON success body; an empty body reads as `null`.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let bytes = response.bytes().await.map_err(map_request_error)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(|err| Error::Parse(err.to_string()));
    }
    serde_json::from_slice(&bytes).map_err(|err| Error::Parse(err.to_string()))
}

/// Reads the `detail` string of an error body, if the server sent one.
pub(crate) async fn error_detail(response: Response) -> Option<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = detail_from_body(&body);
    debug!(status = status.as_u16(), has_detail = detail.is_some(), "auth request rejected");
    detail
}

fn detail_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?.as_str()?;
    // Surfaced verbatim; blank messages count as absent.
    (!detail.trim().is_empty()).then(|| detail.to_string())
}
