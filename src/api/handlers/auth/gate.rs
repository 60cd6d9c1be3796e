//! Per-request authentication gate.
//!
//! Protected handlers call [`require_auth`] first: it reads the access token
//! (cookie, then bearer fallback), validates signature and expiry, loads the
//! referenced account, and hands back a secret-free principal. Handlers never
//! re-validate tokens themselves.
//!
//! The gate is stateless per request: it consults no session table, so a
//! still-valid access token keeps authenticating after logout until it
//! expires.

use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{messages, state::AuthState};
use crate::api::error::ApiError;
use crate::api::handlers::users::{storage as users_storage, types::Profile};

pub(crate) const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub(crate) const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authenticated caller context: the account minus its secrets.
#[derive(Debug, Clone)]
pub(crate) struct Principal {
    pub(crate) user_id: Uuid,
    pub(crate) profile: Profile,
}

/// Resolve the access token into a principal, or reject with 401.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Principal, ApiError> {
    let Some(token) = extract_access_token(headers) else {
        return Err(ApiError::unauthorized(messages::UNAUTHORIZED_REQUEST));
    };

    let claims = state
        .tokens()
        .verify_access(&token)
        .map_err(|_| ApiError::unauthorized(messages::INVALID_ACCESS_TOKEN))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized(messages::INVALID_ACCESS_TOKEN))?;

    let profile = users_storage::fetch_profile(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized(messages::INVALID_ACCESS_TOKEN))?;

    Ok(Principal { user_id, profile })
}

/// Access token from the `accessToken` cookie, falling back to a bearer value.
pub(crate) fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def.ghi; other=1"),
        );
        assert_eq!(
            cookie_value(&headers, ACCESS_TOKEN_COOKIE),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(cookie_value(&headers, REFRESH_TOKEN_COOKIE), None);
    }

    #[test]
    fn cookie_value_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken="));
        assert_eq!(cookie_value(&headers, ACCESS_TOKEN_COOKIE), None);
    }

    #[test]
    fn bearer_token_requires_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(
            extract_access_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn bearer_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(
            extract_access_token(&headers),
            Some("from-bearer".to_string())
        );
    }
}
