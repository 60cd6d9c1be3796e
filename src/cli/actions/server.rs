use crate::{
    api,
    api::handlers::auth::AuthConfig,
    media::MediaConfig,
};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub cors_origin: Option<String>,
    pub media_url: String,
    pub media_api_key: String,
    pub media_timeout_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the media client cannot be built or the server fails
/// to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(
        SecretString::from(args.access_token_secret),
        SecretString::from(args.refresh_token_secret),
    )
    .with_access_ttl_seconds(args.access_token_ttl_seconds)
    .with_refresh_ttl_seconds(args.refresh_token_ttl_seconds)
    .with_cookie_secure(args.cookie_secure);

    let media_config = MediaConfig::new(args.media_url, SecretString::from(args.media_api_key))
        .with_timeout_seconds(args.media_timeout_seconds);

    api::new(args.port, args.dsn, auth_config, media_config, args.cors_origin).await
}
