//! Client-facing handlers.
//!
//! Form submissions answer with a `303 See Other` redirect that carries a
//! one-shot `success` or `error` message in the query string. Only the logout
//! path answers with a JSON error body.

pub mod health;
pub mod login;
pub mod logout;
pub mod register;
pub mod session;

use axum::http::{HeaderMap, header::REFERER};
use axum::response::Redirect;
use serde::Serialize;
use url::{Url, form_urlencoded};
use utoipa::ToSchema;

use super::state::ApiConfig;

const FLASH_KEYS: [&str; 2] = ["success", "error"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    Success,
    Error,
}

impl Flash {
    const fn key(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// JSON error body: `{"status":"error","message":..,"error":..}`.
#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: &str, error: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.to_string(),
            error,
        }
    }
}

/// Redirect to `target` with a flash message, replacing any earlier one.
pub(crate) fn redirect_with(target: &str, flash: Flash, message: &str) -> Redirect {
    Redirect::to(&with_flash(target, flash, message))
}

fn with_flash(target: &str, flash: Flash, message: &str) -> String {
    if let Ok(mut url) = Url::parse(target) {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !FLASH_KEYS.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(kept);
            pairs.append_pair(flash.key(), message);
        }
        return url.to_string();
    }

    let separator = if target.contains('?') { '&' } else { '?' };
    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!("{target}{separator}{}={encoded}", flash.key())
}

/// Where the submitting page lives: the `Referer` when it belongs to the
/// frontend, otherwise `fallback`.
pub(crate) fn back(headers: &HeaderMap, config: &ApiConfig, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|referer| same_origin(referer, config.frontend_base_url()))
        .map_or_else(|| config.page(fallback), ToString::to_string)
}

fn same_origin(candidate: &str, frontend_base_url: &str) -> bool {
    match (Url::parse(candidate), Url::parse(frontend_base_url)) {
        (Ok(candidate), Ok(frontend)) => candidate.origin() == frontend.origin(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> ApiConfig {
        ApiConfig::new("https://app.example.com".to_string())
    }

    #[test]
    fn flash_is_url_encoded() {
        let url = with_flash("https://app.example.com/login", Flash::Success, "Welcome back!");
        assert_eq!(url, "https://app.example.com/login?success=Welcome+back%21");
    }

    #[test]
    fn flash_replaces_previous_messages() {
        let url = with_flash(
            "https://app.example.com/login?next=%2Fdashboard&error=old",
            Flash::Error,
            "new",
        );
        assert_eq!(url, "https://app.example.com/login?next=%2Fdashboard&error=new");
    }

    #[test]
    fn flash_on_relative_target() {
        assert_eq!(with_flash("/login", Flash::Error, "a b"), "/login?error=a+b");
        assert_eq!(with_flash("/login?x=1", Flash::Error, "c"), "/login?x=1&error=c");
    }

    #[test]
    fn back_uses_same_origin_referer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_static("https://app.example.com/signup?plan=pro"),
        );
        assert_eq!(
            back(&headers, &config(), "register"),
            "https://app.example.com/signup?plan=pro"
        );
    }

    #[test]
    fn back_ignores_foreign_referer() {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://evil.example.net/"));
        assert_eq!(
            back(&headers, &config(), "register"),
            "https://app.example.com/register"
        );
        assert_eq!(
            back(&HeaderMap::new(), &config(), "login"),
            "https://app.example.com/login"
        );
    }

    #[test]
    fn error_response_omits_missing_detail() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(ErrorResponse::new("No valid token found", None))?;
        assert_eq!(
            value,
            serde_json::json!({"status": "error", "message": "No valid token found"})
        );
        Ok(())
    }
}
