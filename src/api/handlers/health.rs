use crate::{GIT_COMMIT_HASH, api::state::ApiState};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    /// Sessions currently held, including expired ones not yet swept.
    sessions: usize,
}

impl Health {
    /// `name:version:short-commit`, short commit empty when unknown.
    fn app_header(&self) -> Option<HeaderValue> {
        let short = self.commit.get(..7).filter(|_| self.commit.len() > 7);
        let value = format!("{}:{}:{}", self.name, self.version, short.unwrap_or_default());
        HeaderValue::from_str(&value)
            .inspect_err(|err| error!("Failed to build X-App header: {err}"))
            .ok()
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Gateway is up", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, state: Extension<Arc<ApiState>>) -> Response {
    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions().len().await,
    };

    let mut headers = HeaderMap::new();
    if let Some(app) = health.app_header() {
        headers.insert("X-App", app);
    }

    if method == Method::GET {
        (StatusCode::OK, headers, Json(health)).into_response()
    } else {
        (StatusCode::OK, headers, Body::empty()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::gateway::{Gateway, GatewayConfig, Session};
    use anyhow::Result;
    use axum::body::to_bytes;
    use secrecy::SecretString;
    use serde_json::json;
    use url::Url;

    fn state() -> Result<Extension<Arc<ApiState>>> {
        let gateway = Gateway::new(GatewayConfig::new(Url::parse("http://127.0.0.1:9")?))?;
        let config = ApiConfig::new("http://app.test".to_string());
        Ok(Extension(Arc::new(ApiState::new(config, gateway))))
    }

    #[tokio::test]
    async fn get_returns_build_info_and_session_count() -> Result<()> {
        let state = state()?;
        state
            .sessions()
            .insert(Session {
                token: SecretString::from("T".to_string()),
                user: json!({"id": 1}),
            })
            .await;

        let response = health(Method::GET, state).await;
        assert_eq!(response.status(), StatusCode::OK);

        let x_app = response
            .headers()
            .get("X-App")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(x_app.starts_with(&format!(
            "{}:{}:",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )));

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let health: Health = serde_json::from_slice(&body)?;
        assert_eq!(health.name, env!("CARGO_PKG_NAME"));
        assert_eq!(health.commit, GIT_COMMIT_HASH);
        assert_eq!(health.sessions, 1);
        Ok(())
    }

    #[tokio::test]
    async fn options_has_empty_body() -> Result<()> {
        let response = health(Method::OPTIONS, state()?).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(body.is_empty());
        Ok(())
    }

    #[test]
    fn app_header_shortens_commit() {
        let health = Health {
            commit: "0123456789abcdef".to_string(),
            name: "authgate".to_string(),
            version: "1.2.3".to_string(),
            sessions: 0,
        };
        assert_eq!(
            health.app_header().and_then(|v| v.to_str().ok().map(ToString::to_string)),
            Some("authgate:1.2.3:0123456".to_string())
        );

        let unknown = Health {
            commit: "unknown".to_string(),
            ..health
        };
        assert_eq!(
            unknown.app_header().and_then(|v| v.to_str().ok().map(ToString::to_string)),
            Some("authgate:1.2.3:".to_string())
        );
    }
}
