use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, builder::BoolishValueParser};
use url::Url;

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";
pub const ARG_DEBUG: &str = "debug";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL; redirects go to its /login, /register and /dashboard pages")
                .env("AUTHGATE_FRONTEND_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session lifetime in seconds; expired sessions are swept every minute")
                .long_help(
                    "Session lifetime in seconds. Expired sessions are swept at most every minute. 0 disables expiry: sessions then stay in memory until logout, so abandoned ones are never reclaimed.",
                )
                .env("AUTHGATE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_DEBUG)
                .long(ARG_DEBUG)
                .help("Expose internal error details in client responses")
                .env("AUTHGATE_DEBUG")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: u64,
    pub debug: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if the frontend base URL is not an absolute http(s) URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .context("missing argument: --frontend-base-url")?;
        let parsed = Url::parse(&frontend_base_url)
            .with_context(|| format!("invalid frontend base URL: {frontend_base_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(anyhow!(
                "frontend base URL must be http(s) with a host, got: {frontend_base_url}"
            ));
        }

        Ok(Self {
            frontend_base_url,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL)
                .copied()
                .unwrap_or(43200),
            debug: matches.get_flag(ARG_DEBUG),
        })
    }
}
