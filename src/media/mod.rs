//! External media store client.
//!
//! The store owns the bytes; this service only keeps the returned URL on the
//! account record. Uploads are a single multipart `POST {base}/upload`
//! authorized with a bearer API key.

use anyhow::{Context, Result, bail};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::APP_USER_AGENT;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Clone)]
pub struct MediaConfig {
    base_url: String,
    api_key: SecretString,
    timeout_seconds: u64,
}

impl MediaConfig {
    #[must_use]
    pub fn new(base_url: String, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Result of a successful upload.
#[derive(Debug, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
}

pub struct MediaClient {
    http: reqwest::Client,
    upload_url: Url,
    api_key: SecretString,
}

impl MediaClient {
    /// Build a client from config.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &MediaConfig) -> Result<Self> {
        let upload_url = upload_endpoint(&config.base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("failed to build media HTTP client")?;

        Ok(Self {
            http,
            upload_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Upload one file and return its public URL.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx response, or a
    /// malformed response body.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .context("invalid upload content type")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.upload_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .context("media upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("media store returned {status}");
        }

        response
            .json::<UploadedMedia>()
            .await
            .context("invalid media store response")
    }
}

impl std::fmt::Debug for MediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaClient")
            .field("upload_url", &self.upload_url.as_str())
            .field("api_key", &"***")
            .finish()
    }
}

fn upload_endpoint(base_url: &str) -> Result<Url> {
    let base = base_url.trim_end_matches('/');
    Url::parse(&format!("{base}/upload"))
        .with_context(|| format!("invalid media store URL: {base_url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_endpoint_appends_upload_path() -> Result<()> {
        let url = upload_endpoint("https://media.clipstream.dev/")?;
        assert_eq!(url.as_str(), "https://media.clipstream.dev/upload");
        Ok(())
    }

    #[test]
    fn upload_endpoint_rejects_garbage() {
        assert!(upload_endpoint("not a url").is_err());
    }

    #[test]
    fn debug_never_prints_api_key() -> Result<()> {
        let config = MediaConfig::new(
            "https://media.clipstream.dev".to_string(),
            SecretString::from("super-secret-key"),
        );
        let client = MediaClient::new(&config)?;
        let rendered = format!("{config:?} {client:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("***"));
        Ok(())
    }

    #[test]
    fn config_timeout_override() {
        let config = MediaConfig::new(
            "https://media.clipstream.dev".to_string(),
            SecretString::from("key"),
        )
        .with_timeout_seconds(5);
        assert_eq!(config.timeout_seconds, 5);
    }
}
