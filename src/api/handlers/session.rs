//! Session cookie handling and the session lookup endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::state::{ApiConfig, ApiState};
use crate::gateway::SessionId;

pub(crate) const SESSION_COOKIE_NAME: &str = "authgate_session";

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionResponse {
    /// User record as returned by the authority at login.
    #[schema(value_type = Object)]
    pub user: Value,
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<ApiState>>) -> Response {
    let Some(id) = session_id(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match state.sessions().get(&id).await {
        Some(session) => (
            StatusCode::OK,
            Json(SessionResponse { user: session.user }),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Build a `HttpOnly` cookie carrying the session identifier.
pub(super) fn session_cookie(
    config: &ApiConfig,
    id: &SessionId,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax",
        id.as_str()
    );
    if config.session_ttl_seconds() > 0 {
        cookie.push_str(&format!("; Max-Age={}", config.session_ttl_seconds()));
    }
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(config: &ApiConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Session identifier from a bearer header or the session cookie.
pub(super) fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    if let Some(id) = bearer(headers) {
        return SessionId::from_client(&id);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == SESSION_COOKIE_NAME)
        .and_then(|(_, val)| SessionId::from_client(val))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
