//! Shared state and configuration for the client-facing handlers.

use crate::gateway::{Gateway, SessionStore};
use std::time::Duration;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    frontend_base_url: String,
    session_ttl_seconds: u64,
    debug: bool,
}

impl ApiConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url: frontend_base_url.trim_end_matches('/').to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            debug: false,
        }
    }

    /// `0` disables local session expiry.
    #[must_use]
    pub const fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Expose raw error detail to clients on the logout error path.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub const fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_seconds > 0).then(|| Duration::from_secs(self.session_ttl_seconds))
    }

    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }

    pub(crate) fn page(&self, page: &str) -> String {
        format!("{}/{page}", self.frontend_base_url)
    }
}

pub struct ApiState {
    config: ApiConfig,
    gateway: Gateway,
    sessions: SessionStore,
}

impl ApiState {
    #[must_use]
    pub fn new(config: ApiConfig, gateway: Gateway) -> Self {
        let sessions = SessionStore::new(config.session_ttl());
        Self {
            config,
            gateway,
            sessions,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
