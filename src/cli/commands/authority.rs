use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_AUTHORITY_URL: &str = "authority-url";
pub const ARG_AUTHORITY_TIMEOUT: &str = "authority-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTHORITY_URL)
                .long(ARG_AUTHORITY_URL)
                .help("Base URL of the authentication authority, example: https://auth.tld/api")
                .env("AUTHGATE_AUTHORITY_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_AUTHORITY_TIMEOUT)
                .long(ARG_AUTHORITY_TIMEOUT)
                .help("Timeout in seconds for each request to the authority")
                .env("AUTHGATE_AUTHORITY_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: Url,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if the URL is missing, unparsable, not http(s), or the timeout is zero.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let raw = matches
            .get_one::<String>(ARG_AUTHORITY_URL)
            .context("missing required argument: --authority-url")?;
        let url = Url::parse(raw).with_context(|| format!("invalid authority URL: {raw}"))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(anyhow!(
                "authority URL must be http(s) with a host, got: {raw}"
            ));
        }

        let timeout_seconds = matches
            .get_one::<u64>(ARG_AUTHORITY_TIMEOUT)
            .copied()
            .unwrap_or(10);
        if timeout_seconds == 0 {
            return Err(anyhow!("--{ARG_AUTHORITY_TIMEOUT} must be greater than 0"));
        }

        Ok(Self {
            url,
            timeout_seconds,
        })
    }
}
