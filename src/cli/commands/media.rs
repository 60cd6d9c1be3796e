//! External media store arguments.

use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_MEDIA_URL: &str = "media-url";
pub const ARG_MEDIA_API_KEY: &str = "media-api-key";
pub const ARG_MEDIA_TIMEOUT: &str = "media-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MEDIA_URL)
                .long(ARG_MEDIA_URL)
                .help("Base URL of the external media store")
                .env("CLIPSTREAM_MEDIA_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MEDIA_API_KEY)
                .long(ARG_MEDIA_API_KEY)
                .help("API key for the external media store")
                .env("CLIPSTREAM_MEDIA_API_KEY")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MEDIA_TIMEOUT)
                .long(ARG_MEDIA_TIMEOUT)
                .help("Upload request timeout in seconds")
                .env("CLIPSTREAM_MEDIA_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse the media store arguments.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            url: matches
                .get_one::<String>(ARG_MEDIA_URL)
                .cloned()
                .context("missing required argument: --media-url")?,
            api_key: matches
                .get_one::<String>(ARG_MEDIA_API_KEY)
                .cloned()
                .context("missing required argument: --media-api-key")?,
            timeout_seconds: matches
                .get_one::<u64>(ARG_MEDIA_TIMEOUT)
                .copied()
                .unwrap_or(30),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_url_key_and_timeout() {
        let command = with_args(Command::new("clipstream"));
        let matches = command.get_matches_from(vec![
            "clipstream",
            "--media-url",
            "https://media.clipstream.dev",
            "--media-api-key",
            "key",
            "--media-timeout-seconds",
            "5",
        ]);
        let options = Options::parse(&matches).expect("options should parse");
        assert_eq!(options.url, "https://media.clipstream.dev");
        assert_eq!(options.api_key, "key");
        assert_eq!(options.timeout_seconds, 5);
    }
}
