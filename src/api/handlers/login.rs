use axum::{
    Form,
    extract::{Extension, rejection::FormRejection},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

use super::{
    Flash, back, redirect_with,
    session::{session_cookie, session_id},
};
use crate::api::state::ApiState;
use crate::gateway::{Credentials, GatewayError};

const WELCOME_MESSAGE: &str = "Login successful! Welcome back.";
const REJECTED_MESSAGE: &str = "Login failed. Please try again.";

#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Session cookie set and redirect to the dashboard, or back with an error")
    ),
    tag = "auth"
)]
#[instrument(skip(headers, state, form))]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let config = state.config();
    let back_to = back(&headers, config, "login");

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!("Unreadable login form: {rejection}");
            return redirect_with(&back_to, Flash::Error, &rejection.body_text()).into_response();
        }
    };

    let credentials = Credentials::login(form.email, form.password);

    match state.gateway().login(state.sessions(), &credentials).await {
        Ok((id, _session)) => {
            // A fresh login replaces whatever session this client held.
            if let Some(previous) = session_id(&headers) {
                state.sessions().remove(&previous).await;
            }

            let mut response_headers = HeaderMap::new();
            match session_cookie(config, &id) {
                Ok(cookie) => {
                    response_headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    state.sessions().remove(&id).await;
                    return redirect_with(&back_to, Flash::Error, REJECTED_MESSAGE)
                        .into_response();
                }
            }

            (
                response_headers,
                redirect_with(&config.page("dashboard"), Flash::Success, WELCOME_MESSAGE),
            )
                .into_response()
        }
        Err(err) => {
            if err.is_local() {
                warn!("Login refused before reaching the authority: {err}");
            }
            let message = match &err {
                GatewayError::Validation(_) => err.user_message(),
                GatewayError::AuthorityRejected { message, .. } => message
                    .clone()
                    .unwrap_or_else(|| REJECTED_MESSAGE.to_string()),
                GatewayError::Transport(cause) => {
                    error!("Exception occurred during login: {cause}");
                    format!("An error occurred while communicating with the login service: {cause}")
                }
                GatewayError::MalformedAuthorityResponse(_) | GatewayError::NoActiveSession => {
                    err.user_message()
                }
            };
            redirect_with(&back_to, Flash::Error, &message).into_response()
        }
    }
}
