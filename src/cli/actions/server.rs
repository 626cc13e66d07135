use crate::{
    api::{self, ApiConfig, ApiState},
    cli::telemetry,
    gateway::{Gateway, GatewayConfig},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

// Upper bound on how long an expired session lingers before the sweep.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub authority_url: Url,
    pub authority_timeout_seconds: u64,
    pub frontend_base_url: String,
    pub session_ttl_seconds: u64,
    pub debug: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the authority client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let gateway_config = GatewayConfig::new(args.authority_url)
        .with_timeout(Duration::from_secs(args.authority_timeout_seconds))
        .with_user_agent(format!(
            "{} ({})",
            crate::APP_USER_AGENT,
            crate::GIT_COMMIT_HASH
        ));

    info!(
        "Forwarding authentication to {} (timeout {:?})",
        gateway_config.base_url(),
        gateway_config.timeout()
    );

    let gateway = Gateway::new(gateway_config).context("Failed to build authority client")?;

    let api_config = ApiConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_debug(args.debug);

    let state = Arc::new(ApiState::new(api_config, gateway));

    match state.sessions().ttl() {
        Some(ttl) => {
            info!("Sessions expire after {ttl:?}");
            spawn_session_sweeper(state.clone(), ttl);
        }
        None => warn!("Session expiry disabled; sessions are kept until logout"),
    }

    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}

/// Periodically drop expired sessions so abandoned ones do not accumulate.
fn spawn_session_sweeper(state: Arc<ApiState>, ttl: Duration) {
    let period = ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let purged = state.sessions().purge_expired().await;
            if purged > 0 {
                debug!("Purged {purged} expired sessions");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Session;
    use secrecy::SecretString;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_expired_sessions() -> Result<()> {
        let gateway = Gateway::new(GatewayConfig::new(Url::parse("http://127.0.0.1:9")?))?;
        let config = ApiConfig::new("http://app.test".to_string()).with_session_ttl_seconds(1);
        let state = Arc::new(ApiState::new(config, gateway));
        state
            .sessions()
            .insert(Session {
                token: SecretString::from("T".to_string()),
                user: json!({"id": 1}),
            })
            .await;

        spawn_session_sweeper(state.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(state.sessions().is_empty().await);
        Ok(())
    }
}
