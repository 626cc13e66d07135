use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    ErrorResponse, Flash, redirect_with,
    session::{clear_session_cookie, session_id},
};
use crate::api::state::ApiState;
use crate::gateway::GatewayError;

const NO_TOKEN_MESSAGE: &str = "No valid token found";
const LOGGED_OUT_MESSAGE: &str = "Successfully logged out.";
const REJECTED_MESSAGE: &str = "Logout failed on API side";
const FAILURE_MESSAGE: &str = "Error during logout";
const HIDDEN_DETAIL: &str = "Internal server error";

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session cleared and redirect to the login page, or to the dashboard when the authority refused"),
        (status = 400, description = "No session to log out", body = ErrorResponse),
        (status = 500, description = "The authority could not be reached", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(headers, state))]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<ApiState>>) -> Response {
    let config = state.config();

    let Some(id) = session_id(&headers) else {
        return no_token();
    };

    match state.gateway().logout(state.sessions(), &id).await {
        Ok(()) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = clear_session_cookie(config) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                response_headers,
                redirect_with(&config.page("login"), Flash::Success, LOGGED_OUT_MESSAGE),
            )
                .into_response()
        }
        Err(GatewayError::NoActiveSession) => no_token(),
        Err(GatewayError::AuthorityRejected { .. }) => {
            redirect_with(&config.page("dashboard"), Flash::Error, REJECTED_MESSAGE)
                .into_response()
        }
        Err(err) => {
            error!("Error during logout: {err}");
            let detail = if config.debug() {
                err.to_string()
            } else {
                HIDDEN_DETAIL.to_string()
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(FAILURE_MESSAGE, Some(detail))),
            )
                .into_response()
        }
    }
}

fn no_token() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(NO_TOKEN_MESSAGE, None)),
    )
        .into_response()
}
