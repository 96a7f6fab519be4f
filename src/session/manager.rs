//! The session manager: token pair ownership, auth service calls, and forced
//! logout on authorization failure.
//!
//! Every operation is a single suspend point around one HTTP call. Nothing is
//! retried and nothing runs in the background. The token store is shared
//! mutable state with last-write-wins semantics, so a superseded login that
//! completes late still overwrites the store.

use super::{
    api::{self, ApiClient},
    claims::{self, DecodedClaims},
    config::SessionConfig,
    error::{Error, ACCOUNT_NOT_ACTIVE},
    events::{EventBus, SessionEvent},
    store::{KeyValueStore, TokenStore},
    types::{
        Credentials, OtpRequest, OtpVerification, RefreshTokenRequest, RegistrationBody,
        RegistrationPending, RegistrationRequest, SessionState, TokenPair, TokenResponse,
        TokenValidation,
    },
};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

const TOKEN_PATH: &str = "/auth/token";
const REGISTER_PATH: &str = "/auth/register";
const REQUEST_OTP_PATH: &str = "/auth/request-otp";
const ACTIVATE_PATH: &str = "/auth/activate-account";
const VERIFY_OTP_PATH: &str = "/auth/verify-otp";
const REFRESH_PATH: &str = "/auth/refresh-token";
const VALIDATE_PATH: &str = "/auth/validate-token";

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const OTP_REQUEST_FAILED: &str = "Failed to send OTP";
const ACTIVATION_FAILED: &str = "Account activation failed";
const OTP_VERIFICATION_FAILED: &str = "OTP verification failed";
const REFRESH_FAILED: &str = "Token refresh failed";
const NOT_LOGGED_IN: &str = "Not logged in";

pub struct SessionManager {
    api: ApiClient,
    store: TokenStore,
    events: EventBus,
}

impl SessionManager {
    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(config: &SessionConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, Error> {
        Ok(Self {
            api: ApiClient::new(config)?,
            store: TokenStore::new(store),
            events: EventBus::new(),
        })
    }

    /// Receives lifecycle events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Exchanges username and password for a token pair.
    ///
    /// # Errors
    /// - `ActivationRequired` when the server reports an inactive account.
    /// - `Auth` with the server detail (or "Login failed") on any other rejection.
    /// - `Decode` when the issued access token cannot be decoded; the pair is discarded.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, Error> {
        let credentials = Credentials::new(username, password);
        let response = self.api.post_form(TOKEN_PATH, &credentials.form()).await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = api::error_detail(response).await;
            if detail.as_deref() == Some(ACCOUNT_NOT_ACTIVE) {
                info!(status = status.as_u16(), "login refused: account not active");
                return Err(Error::ActivationRequired {
                    message: ACCOUNT_NOT_ACTIVE.to_string(),
                });
            }
            info!(status = status.as_u16(), "login refused");
            return Err(Error::Auth {
                message: detail.unwrap_or_else(|| LOGIN_FAILED.to_string()),
            });
        }

        self.establish(response).await
    }

    /// Creates an account. The session stays anonymous; the email is kept for
    /// the activation step.
    ///
    /// # Errors
    /// Returns `Registration` with the server detail or a generic message.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegistrationPending, Error> {
        let request = RegistrationRequest::new(username, email, password);
        let response = self
            .api
            .post_json(REGISTER_PATH, &RegistrationBody::from(&request))
            .await?;

        if !response.status().is_success() {
            return Err(Error::Registration {
                message: api::error_detail(response)
                    .await
                    .unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
            });
        }

        // Any token in the body is ignored: the account is not active yet.
        if let Err(err) = self.store.set_registered_email(&request.email) {
            warn!("failed to remember registered email: {err}");
        }
        info!("registration accepted, activation pending");

        Ok(RegistrationPending {
            email: request.email,
        })
    }

    /// Asks the server to (re)send an activation code. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns `OtpRequest` with the server detail or a generic message.
    #[instrument(skip(self))]
    pub async fn request_otp(&self, email: &str) -> Result<(), Error> {
        let response = self
            .api
            .post_json(REQUEST_OTP_PATH, &OtpRequest { email })
            .await?;

        if response.status().is_success() {
            debug!("otp requested");
            Ok(())
        } else {
            Err(Error::OtpRequest {
                message: api::error_detail(response)
                    .await
                    .unwrap_or_else(|| OTP_REQUEST_FAILED.to_string()),
            })
        }
    }

    /// Submits an activation code. Does not log the user in.
    ///
    /// # Errors
    /// Returns `Activation` with the server detail or a generic message.
    #[instrument(skip(self, otp_code))]
    pub async fn activate_account(&self, email: &str, otp_code: &str) -> Result<(), Error> {
        let response = self
            .api
            .post_json(ACTIVATE_PATH, &OtpVerification { email, otp_code })
            .await?;

        if response.status().is_success() {
            info!("account activated");
            Ok(())
        } else {
            Err(Error::Activation {
                message: api::error_detail(response)
                    .await
                    .unwrap_or_else(|| ACTIVATION_FAILED.to_string()),
            })
        }
    }

    /// Submits an OTP to the verification endpoint, which answers with a token
    /// pair; the session is established like a login.
    ///
    /// # Errors
    /// Returns `Activation` on rejection, `Decode` if the issued token is malformed.
    #[instrument(skip(self, otp_code))]
    pub async fn verify_otp(&self, email: &str, otp_code: &str) -> Result<TokenPair, Error> {
        let response = self
            .api
            .post_json(VERIFY_OTP_PATH, &OtpVerification { email, otp_code })
            .await?;

        if !response.status().is_success() {
            return Err(Error::Activation {
                message: api::error_detail(response)
                    .await
                    .unwrap_or_else(|| OTP_VERIFICATION_FAILED.to_string()),
            });
        }

        self.establish(response).await
    }

    /// Exchanges the stored refresh token for a new pair. Never called implicitly.
    ///
    /// # Errors
    /// - `Auth` when no pair is stored, or the server rejects with another status.
    /// - `AuthorizationLost` on 401/403; the store is cleared first.
    /// - `Decode` if the new access token is malformed.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<TokenPair, Error> {
        let Some(current) = self.store.load()? else {
            return Err(Error::Auth {
                message: NOT_LOGGED_IN.to_string(),
            });
        };

        let response = self
            .api
            .post_json(
                REFRESH_PATH,
                &RefreshTokenRequest {
                    refresh_token: current.refresh_token(),
                },
            )
            .await?;

        let status = response.status();
        if is_authorization_failure(status) {
            return Err(self.lose_authorization(status));
        }
        if !status.is_success() {
            return Err(Error::Auth {
                message: api::error_detail(response)
                    .await
                    .unwrap_or_else(|| REFRESH_FAILED.to_string()),
            });
        }

        self.establish(response).await
    }

    /// Clears the token pair and role cache. Never fails; a store error is logged.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        if let Err(err) = self.store.clear() {
            warn!("failed to clear token store on logout: {err}");
        }
        self.events.emit(SessionEvent::LoggedOut);
        info!("logged out");
    }

    /// Derives the state from the stored pair. An undecodable access token or
    /// an unreadable store is cleared and reported as anonymous.
    pub fn current_state(&self) -> SessionState {
        match self.claims() {
            Some(claims) => SessionState::Authenticated {
                roles: claims.roles,
            },
            None => SessionState::Anonymous,
        }
    }

    /// Decoded claims of the stored access token.
    pub fn claims(&self) -> Option<DecodedClaims> {
        let pair = match self.store.load() {
            Ok(Some(pair)) => pair,
            Ok(None) => return None,
            Err(err) => {
                self.invalidate(&format!("token store unreadable: {err}"));
                return None;
            }
        };

        match claims::decode(pair.access_token()) {
            Ok(claims) => Some(claims),
            Err(err) => {
                self.invalidate(&err.to_string());
                None
            }
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.claims().is_some_and(|claims| claims.has_role(role))
    }

    pub fn is_super_user(&self) -> bool {
        self.claims().is_some_and(|claims| claims.is_super_user())
    }

    /// The stored pair, if any.
    ///
    /// # Errors
    /// Returns `Store` if the backing store cannot be read.
    pub fn token_pair(&self) -> Result<Option<TokenPair>, Error> {
        Ok(self.store.load()?)
    }

    /// Email used by the last successful `register` call against this store.
    /// Survives logout so a later activation can reuse it.
    pub fn registered_email(&self) -> Option<String> {
        self.store.registered_email().unwrap_or_else(|err| {
            warn!("failed to read registered email: {err}");
            None
        })
    }

    /// Sends a request with the bearer token attached when one is stored.
    ///
    /// `path` is resolved against the base URL; absolute URLs are used as is.
    ///
    /// # Errors
    /// - `AuthorizationLost` on 401/403, after the store has been cleared.
    /// - `Http` with the status on any other non-success response.
    /// - `Parse` if the success body is not JSON.
    #[instrument(skip(self, body))]
    pub async fn authorized_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let pair = self.store.load()?;
        let bearer = pair.as_ref().map(TokenPair::access_token);

        let response = self.api.send(method, path, body, bearer).await?;
        let status = response.status();

        if is_authorization_failure(status) {
            return Err(self.lose_authorization(status));
        }
        if !status.is_success() {
            debug!(status = status.as_u16(), "authorized request failed");
            return Err(Error::Http {
                status: status.as_u16(),
            });
        }

        api::read_json(response).await
    }

    /// Asks the server whether the stored token is still accepted.
    ///
    /// # Errors
    /// Same as `authorized_request`.
    pub async fn validate(&self) -> Result<TokenValidation, Error> {
        let body = self.authorized_request(Method::GET, VALIDATE_PATH, None).await?;
        serde_json::from_value(body).map_err(|err| Error::Parse(err.to_string()))
    }

    /// Reads a token response, decodes it, and persists the pair. Nothing is
    /// stored unless the access token decodes.
    async fn establish(&self, response: Response) -> Result<TokenPair, Error> {
        let tokens: TokenResponse = api::read_json(response).await?;
        let Some(refresh_token) = tokens.refresh_token else {
            return Err(Error::Parse("missing refresh_token".to_string()));
        };
        let pair = TokenPair::new(tokens.access_token, refresh_token);

        let claims = match claims::decode(pair.access_token()) {
            Ok(claims) => claims,
            Err(err) => {
                warn!("server issued an undecodable access token: {err}");
                self.invalidate(&err.to_string());
                return Err(err.into());
            }
        };

        self.store.save(&pair, &claims.roles)?;
        info!(subject = ?claims.subject, roles = ?claims.roles, "session established");
        self.events.emit(SessionEvent::LoggedIn {
            subject: claims.subject,
            roles: claims.roles,
        });

        Ok(pair)
    }

    /// Discards the stored pair after a decode failure.
    fn invalidate(&self, reason: &str) {
        warn!("discarding access token: {reason}");
        if let Err(err) = self.store.clear() {
            warn!("failed to clear token store: {err}");
        }
        self.events.emit(SessionEvent::Invalidated {
            reason: reason.to_string(),
        });
    }

    /// Clears the store after a 401/403 and builds the error to return.
    fn lose_authorization(&self, status: StatusCode) -> Error {
        warn!(status = status.as_u16(), "authorization lost, clearing session");
        if let Err(err) = self.store.clear() {
            warn!("failed to clear token store: {err}");
        }
        self.events.emit(SessionEvent::AuthorizationLost {
            status: status.as_u16(),
        });
        Error::AuthorizationLost {
            status: status.as_u16(),
        }
    }
}

fn is_authorization_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::{MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

    #[allow(clippy::unwrap_used)]
    fn manager_with(store: &MemoryStore) -> SessionManager {
        // Nothing listens here; tests below never reach the network.
        let config = SessionConfig::new("http://127.0.0.1:9").unwrap();
        SessionManager::new(&config, Arc::new(store.clone())).unwrap()
    }

    #[test]
    fn authorization_failure_statuses() {
        assert!(is_authorization_failure(StatusCode::UNAUTHORIZED));
        assert!(is_authorization_failure(StatusCode::FORBIDDEN));
        assert!(!is_authorization_failure(StatusCode::NOT_FOUND));
        assert!(!is_authorization_failure(StatusCode::OK));
    }

    #[test]
    fn fresh_manager_is_anonymous() {
        let store = MemoryStore::new();
        let manager = manager_with(&store);
        assert_eq!(manager.current_state(), SessionState::Anonymous);
        assert_eq!(manager.registered_email(), None);
        assert!(!manager.is_super_user());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn corrupt_stored_token_is_cleared_on_read() {
        let store = MemoryStore::new();
        store
            .set_many(&[
                (ACCESS_TOKEN_KEY, "garbage".to_string()),
                (REFRESH_TOKEN_KEY, "refresh".to_string()),
            ])
            .unwrap();
        let manager = manager_with(&store);
        let mut events = manager.subscribe();

        assert_eq!(manager.current_state(), SessionState::Anonymous);
        assert!(store.is_empty());
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::Invalidated { .. })
        ));
    }

    #[test]
    fn logout_is_idempotent() {
        let store = MemoryStore::new();
        let manager = manager_with(&store);
        let mut events = manager.subscribe();

        manager.logout();
        manager.logout();

        assert_eq!(manager.current_state(), SessionState::Anonymous);
        assert!(store.is_empty());
        assert_eq!(events.try_recv().ok(), Some(SessionEvent::LoggedOut));
        assert_eq!(events.try_recv().ok(), Some(SessionEvent::LoggedOut));
    }

    #[tokio::test]
    async fn refresh_without_session_does_not_call_out() {
        let store = MemoryStore::new();
        let manager = manager_with(&store);
        let result = manager.refresh().await;
        assert!(matches!(result, Err(Error::Auth { message }) if message == NOT_LOGGED_IN));
    }
}
