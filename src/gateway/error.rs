use super::credentials::ValidationError;
use thiserror::Error;

const MALFORMED_MESSAGE: &str = "Unexpected response from the authentication service.";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Input failed local checks; no request was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// The authority could not be reached, or the call timed out.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The authority answered with a non-success status.
    #[error("authority rejected request with status {status}")]
    AuthorityRejected {
        status: u16,
        body: String,
        message: Option<String>,
    },
    /// The authority answered 2xx with a body we cannot use.
    #[error("malformed authority response: {0}")]
    MalformedAuthorityResponse(String),
    /// Logout requested without a stored session; no request was sent.
    #[error("no active session")]
    NoActiveSession,
}

impl GatewayError {
    /// Whether the error was decided without talking to the authority.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NoActiveSession)
    }

    /// Authority-supplied message on a rejection, if any.
    #[must_use]
    pub fn authority_message(&self) -> Option<&str> {
        match self {
            Self::AuthorityRejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text safe to show an end user for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Transport(err) => format!("Could not reach the authentication service: {err}"),
            Self::AuthorityRejected { message, .. } => message
                .clone()
                .unwrap_or_else(|| "The authentication service rejected the request.".to_string()),
            Self::MalformedAuthorityResponse(_) => MALFORMED_MESSAGE.to_string(),
            Self::NoActiveSession => "No valid token found".to_string(),
        }
    }
}
