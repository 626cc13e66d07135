use axum::{
    Form,
    extract::{Extension, rejection::FormRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

use super::{Flash, back, redirect_with};
use crate::api::state::ApiState;
use crate::gateway::{Credentials, GatewayError, Role};

const REJECTED_MESSAGE: &str = "API registration failed. Please try again.";

#[derive(ToSchema, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_confirmation: Option<String>,
    /// `user` (default) or `admin`
    #[serde(default)]
    role: Option<String>,
}

impl RegisterForm {
    fn into_credentials(self) -> Result<Credentials, GatewayError> {
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(role) => Some(role.parse::<Role>()?),
        };

        let mut credentials = Credentials::login(self.email, self.password);
        if let Some(name) = self.name.filter(|name| !name.trim().is_empty()) {
            credentials = credentials.with_name(name);
        }
        if let Some(confirmation) = self.password_confirmation {
            credentials = credentials.with_password_confirmation(confirmation);
        }
        if let Some(role) = role {
            credentials = credentials.with_role(role);
        }
        Ok(credentials)
    }
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the login page with the authority's message, or back with an error")
    ),
    tag = "auth"
)]
#[instrument(skip(headers, state, form))]
pub async fn register(
    headers: HeaderMap,
    state: Extension<Arc<ApiState>>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let config = state.config();
    let back_to = back(&headers, config, "register");

    let credentials = match form {
        Ok(Form(form)) => form.into_credentials(),
        Err(rejection) => {
            warn!("Unreadable registration form: {rejection}");
            return redirect_with(&back_to, Flash::Error, &rejection.body_text()).into_response();
        }
    };

    let result = match credentials {
        Ok(credentials) => state.gateway().register(&credentials).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(message) => redirect_with(&config.page("login"), Flash::Success, &message).into_response(),
        Err(err) => {
            if err.is_local() {
                warn!("Registration refused before reaching the authority: {err}");
            }
            let message = match &err {
                GatewayError::Validation(_) => err.user_message(),
                GatewayError::AuthorityRejected { .. } => REJECTED_MESSAGE.to_string(),
                GatewayError::Transport(cause) => {
                    error!("Exception occurred during registration: {cause}");
                    format!(
                        "An error occurred while communicating with the registration service: {cause}"
                    )
                }
                GatewayError::MalformedAuthorityResponse(_) | GatewayError::NoActiveSession => {
                    error!("Registration failed: {err}");
                    err.user_message()
                }
            };
            redirect_with(&back_to, Flash::Error, &message).into_response()
        }
    }
}
