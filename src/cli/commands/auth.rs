//! Token-signing and cookie arguments.

use anyhow::{Result, bail};
use clap::{Arg, Command};

pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

// HS256 keys shorter than this are brute-forceable.
const MIN_SECRET_LEN: usize = 32;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("Signing secret for short-lived access tokens")
                .env("CLIPSTREAM_ACCESS_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("Signing secret for long-lived refresh tokens")
                .env("CLIPSTREAM_REFRESH_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token lifetime in seconds")
                .env("CLIPSTREAM_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token lifetime in seconds")
                .env("CLIPSTREAM_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("864000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Set the Secure flag on session cookies")
                .env("CLIPSTREAM_COOKIE_SECURE")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Exact allowed CORS origin; credentials are only allowed when set")
                .env("CLIPSTREAM_CORS_ORIGIN"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub cors_origin: Option<String>,
}

impl Options {
    /// Parse and validate the token arguments.
    ///
    /// # Errors
    /// Returns an error if a secret is too short, or if both token classes
    /// share one signing secret.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let access_token_secret = matches
            .get_one::<String>(ARG_ACCESS_TOKEN_SECRET)
            .cloned()
            .unwrap_or_default();
        let refresh_token_secret = matches
            .get_one::<String>(ARG_REFRESH_TOKEN_SECRET)
            .cloned()
            .unwrap_or_default();

        if access_token_secret.len() < MIN_SECRET_LEN {
            bail!("--{ARG_ACCESS_TOKEN_SECRET} must be at least {MIN_SECRET_LEN} bytes");
        }
        if refresh_token_secret.len() < MIN_SECRET_LEN {
            bail!("--{ARG_REFRESH_TOKEN_SECRET} must be at least {MIN_SECRET_LEN} bytes");
        }
        // Distinct keys per token class: compromise of one never forges the other.
        if access_token_secret == refresh_token_secret {
            bail!("--{ARG_ACCESS_TOKEN_SECRET} and --{ARG_REFRESH_TOKEN_SECRET} must differ");
        }

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL)
                .copied()
                .unwrap_or(86_400),
            refresh_token_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TOKEN_TTL)
                .copied()
                .unwrap_or(864_000),
            cookie_secure: matches
                .get_one::<bool>(ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(true),
            cors_origin: matches.get_one::<String>(ARG_CORS_ORIGIN).cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: Vec<&str>) -> clap::ArgMatches {
        let command = with_args(Command::new("clipstream"));
        command.get_matches_from(args)
    }

    #[test]
    fn parse_accepts_distinct_secrets() {
        let matches = matches(vec![
            "clipstream",
            "--access-token-secret",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "--refresh-token-secret",
            "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
        ]);
        let options = Options::parse(&matches).expect("options should parse");
        assert_eq!(options.access_token_ttl_seconds, 86_400);
        assert_eq!(options.refresh_token_ttl_seconds, 864_000);
        assert!(options.cookie_secure);
        assert_eq!(options.cors_origin, None);
    }

    #[test]
    fn parse_rejects_shared_secret() {
        let matches = matches(vec![
            "clipstream",
            "--access-token-secret",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "--refresh-token-secret",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        ]);
        assert!(Options::parse(&matches).is_err());
    }

    #[test]
    fn parse_rejects_short_secret() {
        let matches = matches(vec![
            "clipstream",
            "--access-token-secret",
            "short",
            "--refresh-token-secret",
            "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
        ]);
        assert!(Options::parse(&matches).is_err());
    }
}
