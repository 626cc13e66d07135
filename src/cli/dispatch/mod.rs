use crate::cli::{
    actions::{Action, server::Args},
    commands::{authority, session},
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let authority = authority::Options::parse(matches).context("invalid authority settings")?;
    let session = session::Options::parse(matches).context("invalid session settings")?;

    Ok(Action::Server(Args {
        port,
        authority_url: authority.url,
        authority_timeout_seconds: authority.timeout_seconds,
        frontend_base_url: session.frontend_base_url,
        session_ttl_seconds: session.session_ttl_seconds,
        debug: session.debug,
    }))
}
