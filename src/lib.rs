//! # Authgate (session-backed authentication gateway)
//!
//! `authgate` sits between end-user clients and an external authentication
//! authority. It accepts registration, login and logout submissions, forwards
//! them to the authority over HTTP, and keeps the token the authority issues
//! in a server-side session bound to the client by an opaque cookie.
//!
//! ## Sessions
//!
//! A session is created only when the authority accepts a login and returns
//! `data.authorization.token` and `data.user`. It is cleared only after the
//! authority confirms a logout; a refused or unreachable logout leaves the
//! client signed in. Sessions optionally expire after a configured TTL.
//!
//! ## Errors
//!
//! Every gateway outcome is a [`gateway::GatewayError`] variant: local
//! validation, transport failure, authority rejection, malformed authority
//! response, or logout without a session.

pub mod api;
pub mod cli;
pub mod gateway;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
