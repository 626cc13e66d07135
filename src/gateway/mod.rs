//! Auth Gateway core.
//!
//! Forwards credential submissions to an external authentication authority
//! and keeps the token it hands back in a per-client [`SessionStore`].
//!
//! Each operation makes at most one request to the authority and never
//! retries. Validation failures and logouts without a session are resolved
//! locally, before any request is built.

pub mod credentials;
pub mod error;
pub mod session;

pub use credentials::{Credentials, Role, ValidationError};
pub use error::GatewayError;
pub use session::{Session, SessionId, SessionStore};

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{Instrument, error, info, info_span, instrument, warn};
use url::Url;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    base_url: Url,
    timeout: Duration,
    user_agent: String,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            user_agent: crate::APP_USER_AGENT.to_string(),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `{base}/{operation}`, keeping any path prefix on the base URL.
    #[must_use]
    pub fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            operation.trim_start_matches('/')
        )
    }
}

/// A reply from the authority, read in full and consumed immediately.
#[derive(Debug)]
struct AuthorityResponse {
    status: u16,
    body: String,
}

impl AuthorityResponse {
    const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    fn json(&self) -> Result<Value, GatewayError> {
        serde_json::from_str(&self.body).map_err(|err| {
            GatewayError::MalformedAuthorityResponse(format!("body is not JSON: {err}"))
        })
    }

    fn message(&self) -> Option<String> {
        serde_json::from_str::<Value>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(ToString::to_string)
    }

    fn into_rejection(self) -> GatewayError {
        let message = self.message();
        GatewayError::AuthorityRejected {
            status: self.status,
            body: self.body,
            message,
        }
    }

    /// Pull `data.authorization.token` and `data.user` out of a login reply.
    fn into_session(self) -> Result<Session, GatewayError> {
        let value = self.json()?;
        let data = value.get("data").ok_or_else(|| {
            GatewayError::MalformedAuthorityResponse("missing data".to_string())
        })?;

        let token = data
            .get("authorization")
            .and_then(|authorization| authorization.get("token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                GatewayError::MalformedAuthorityResponse(
                    "missing data.authorization.token".to_string(),
                )
            })?;

        let user = data
            .get("user")
            .filter(|user| !user.is_null())
            .cloned()
            .ok_or_else(|| {
                GatewayError::MalformedAuthorityResponse("missing data.user".to_string())
            })?;

        Ok(Session {
            token: SecretString::from(token.to_string()),
            user,
        })
    }
}

#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    client: Client,
}

impl Gateway {
    /// Build the gateway and its HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Register a new account with the authority.
    ///
    /// Returns the authority's `message` verbatim.
    ///
    /// # Errors
    /// See [`GatewayError`]; validation failures never reach the network.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn register(&self, credentials: &Credentials) -> Result<String, GatewayError> {
        credentials.validate_registration()?;

        let reply = self
            .post("register", Some(&credentials.registration_payload()), None)
            .await?;

        if !reply.is_success() {
            error!("Registration rejected with status {}", reply.status);
            return Err(reply.into_rejection());
        }

        reply
            .json()?
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| GatewayError::MalformedAuthorityResponse("missing message".to_string()))
    }

    /// Log in and store the resulting session under a new identifier.
    ///
    /// # Errors
    /// See [`GatewayError`]; nothing is stored unless the call succeeds.
    #[instrument(skip(self, sessions, credentials), fields(email = %credentials.email()))]
    pub async fn login(
        &self,
        sessions: &SessionStore,
        credentials: &Credentials,
    ) -> Result<(SessionId, Session), GatewayError> {
        credentials.validate_login()?;

        let reply = self
            .post("login", Some(&credentials.login_payload()), None)
            .await?;

        if !reply.is_success() {
            warn!("Login rejected with status {}", reply.status);
            return Err(reply.into_rejection());
        }

        let session = reply.into_session().inspect_err(|err| {
            error!("Login response unusable: {err}");
        })?;
        let id = sessions.insert(session.clone()).await;

        info!("Session established");

        Ok((id, session))
    }

    /// Invalidate the session's token at the authority, then forget it locally.
    ///
    /// The session is claimed before the request so a concurrent logout for
    /// the same identifier resolves to [`GatewayError::NoActiveSession`]
    /// without a second request. It is only cleared once the authority
    /// confirms; any failure releases the claim and leaves it in place.
    ///
    /// # Errors
    /// [`GatewayError::NoActiveSession`] without a network call when `id` has
    /// no live session; otherwise see [`GatewayError`].
    #[instrument(skip(self, sessions))]
    pub async fn logout(&self, sessions: &SessionStore, id: &SessionId) -> Result<(), GatewayError> {
        let session = sessions
            .begin_logout(id)
            .await
            .ok_or(GatewayError::NoActiveSession)?;

        let reply = match self.post("logout", None, Some(&session.token)).await {
            Ok(reply) => reply,
            Err(err) => {
                sessions.release(id).await;
                return Err(err);
            }
        };

        if !reply.is_success() {
            error!("Logout rejected with status {}", reply.status);
            sessions.release(id).await;
            return Err(reply.into_rejection());
        }

        sessions.remove(id).await;

        info!("Session cleared");

        Ok(())
    }

    async fn post(
        &self,
        operation: &'static str,
        payload: Option<&Value>,
        bearer: Option<&SecretString>,
    ) -> Result<AuthorityResponse, GatewayError> {
        let url = self.config.endpoint(operation);

        let span = info_span!(
            "authority.request",
            http.method = "POST",
            url = %url,
            operation
        );

        let mut request = self.client.post(&url);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .instrument(span.clone())
            .await
            .map_err(|err| {
                error!("Error connecting to {url}: {err}");
                GatewayError::Transport(err)
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Error reading response from {url}: {err}");
                GatewayError::Transport(err)
            })?;

        info!("Authority {operation} response status: {status}");

        let reply = AuthorityResponse { status, body };
        if !reply.is_success() {
            error!("Authority {operation} error details: {}", reply.body);
        }

        Ok(reply)
    }
}
