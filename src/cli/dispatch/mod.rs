//! Command-line argument dispatch and server initialization.
//!
//! Parses validated CLI arguments and maps them to the appropriate action,
//! such as starting the API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, auth, media};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let media_opts = media::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        access_token_secret: auth_opts.access_token_secret,
        refresh_token_secret: auth_opts.refresh_token_secret,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        refresh_token_ttl_seconds: auth_opts.refresh_token_ttl_seconds,
        cookie_secure: auth_opts.cookie_secure,
        cors_origin: auth_opts.cors_origin,
        media_url: media_opts.url,
        media_api_key: media_opts.api_key,
        media_timeout_seconds: media_opts.timeout_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_action_from_env() {
        temp_env::with_vars(
            [
                (
                    "CLIPSTREAM_DSN",
                    Some("postgres://user@localhost:5432/clipstream"),
                ),
                (
                    "CLIPSTREAM_ACCESS_TOKEN_SECRET",
                    Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                ),
                (
                    "CLIPSTREAM_REFRESH_TOKEN_SECRET",
                    Some("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
                ),
                ("CLIPSTREAM_MEDIA_URL", Some("https://media.clipstream.dev")),
                ("CLIPSTREAM_MEDIA_API_KEY", Some("media-key")),
            ],
            || {
                let command = commands::new();
                let matches = command.get_matches_from(vec!["clipstream"]);
                let Action::Server(args) = handler(&matches).expect("handler should succeed");
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/clipstream");
                assert!(args.cookie_secure);
                assert_eq!(args.media_timeout_seconds, 30);
            },
        );
    }

    #[test]
    fn handler_rejects_shared_signing_secret() {
        temp_env::with_vars(
            [
                (
                    "CLIPSTREAM_DSN",
                    Some("postgres://user@localhost:5432/clipstream"),
                ),
                (
                    "CLIPSTREAM_ACCESS_TOKEN_SECRET",
                    Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                ),
                (
                    "CLIPSTREAM_REFRESH_TOKEN_SECRET",
                    Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                ),
                ("CLIPSTREAM_MEDIA_URL", Some("https://media.clipstream.dev")),
                ("CLIPSTREAM_MEDIA_API_KEY", Some("media-key")),
            ],
            || {
                let command = commands::new();
                let matches = command.get_matches_from(vec!["clipstream"]);
                assert!(handler(&matches).is_err());
            },
        );
    }
}
