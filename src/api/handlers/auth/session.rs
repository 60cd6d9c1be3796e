//! Session endpoints: login, logout, and refresh-token rotation.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    gate::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, cookie_value, require_auth},
    messages, password,
    state::{AuthConfig, AuthState},
    storage,
    tokens::{TokenError, TokenPair},
    types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse},
};
use crate::api::error::ApiError;
use crate::api::handlers::utils::normalize_username;
use crate::api::response::ApiResponse;

#[utoipa::path(
    post,
    path = "/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; session cookies set", body = LoginResponse),
        (status = 400, description = "Username or email missing"),
        (status = 401, description = "Unknown account or wrong password"),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation(messages::MISSING_PAYLOAD));
    };

    let username = request
        .username
        .as_deref()
        .map(normalize_username)
        .filter(|value| !value.is_empty());
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if username.is_none() && email.is_none() {
        return Err(ApiError::validation(messages::IDENTITY_REQUIRED));
    }

    let record = storage::find_by_identity(&pool, username.as_deref(), email)
        .await?
        .ok_or_else(|| ApiError::unauthorized(messages::USER_DOES_NOT_EXIST))?;

    if !password::verify_password(&request.password, &record.password_hash)? {
        return Err(ApiError::unauthorized(messages::INVALID_CREDENTIALS));
    }

    let pair = state
        .tokens()
        .issue_pair(record.user_id)
        .map_err(signing_failure)?;

    // Overwrites any previous refresh token, ending other sessions for this
    // account.
    storage::set_refresh_token(&pool, record.user_id, &pair.refresh_token).await?;

    let mut headers = HeaderMap::new();
    append_token_cookies(&mut headers, state.config(), &pair)?;

    let body = ApiResponse::ok(
        LoginResponse {
            user: record.profile,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        },
        messages::LOGIN_OK,
    );

    Ok((headers, body).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/users/logout",
    responses(
        (status = 200, description = "Session ended; cookies cleared"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;

    let store_result = storage::clear_refresh_token(&pool, principal.user_id).await;

    // Client cookies are cleared regardless of the store outcome.
    let mut response_headers = HeaderMap::new();
    clear_token_cookies(&mut response_headers, state.config());

    if let Err(err) = store_result {
        error!("Failed to clear stored refresh token: {err}");
        let failure = ApiError::from(err).into_response();
        let (mut parts, body) = failure.into_parts();
        parts.headers.extend(response_headers);
        return Ok(Response::from_parts(parts, body));
    }

    let body = ApiResponse::ok(serde_json::json!({}), messages::LOGOUT_OK);
    Ok((response_headers, body).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/users/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued; cookies replaced", body = RefreshResponse),
        (status = 401, description = "Missing, invalid, expired, or already-used refresh token"),
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let presented = cookie_value(&headers, REFRESH_TOKEN_COOKIE).or_else(|| {
        payload
            .and_then(|Json(request)| request.refresh_token)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    });
    let Some(presented) = presented else {
        return Err(ApiError::unauthorized(messages::UNAUTHORIZED_REQUEST));
    };

    let claims = state
        .tokens()
        .verify_refresh(&presented)
        .map_err(|_| ApiError::unauthorized(messages::INVALID_REFRESH_TOKEN))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized(messages::INVALID_REFRESH_TOKEN))?;

    if !storage::user_exists(&pool, user_id).await? {
        return Err(ApiError::unauthorized(messages::INVALID_REFRESH_TOKEN));
    }

    let pair = state.tokens().issue_pair(user_id).map_err(signing_failure)?;

    // Single conditional swap: a presented token that is not the stored one
    // (already rotated, replaced by a newer login, or cleared by logout)
    // loses here.
    if !storage::rotate_refresh_token(&pool, user_id, &presented, &pair.refresh_token).await? {
        return Err(ApiError::unauthorized(messages::REFRESH_TOKEN_REUSED));
    }

    let mut response_headers = HeaderMap::new();
    append_token_cookies(&mut response_headers, state.config(), &pair)?;

    let body = ApiResponse::ok(
        RefreshResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        },
        messages::REFRESH_OK,
    );

    Ok((response_headers, body).into_response())
}

fn signing_failure(err: TokenError) -> ApiError {
    ApiError::from(anyhow::Error::new(err).context("failed to issue session tokens"))
}

/// Build one `HttpOnly` session cookie.
fn token_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    token_cookie(name, "", 0, secure)
}

pub(super) fn append_token_cookies(
    headers: &mut HeaderMap,
    config: &AuthConfig,
    pair: &TokenPair,
) -> Result<(), ApiError> {
    let access = token_cookie(
        ACCESS_TOKEN_COOKIE,
        &pair.access_token,
        config.access_ttl_seconds(),
        config.cookie_secure(),
    )
    .map_err(|err| ApiError::from(anyhow::Error::new(err)))?;
    let refresh = token_cookie(
        REFRESH_TOKEN_COOKIE,
        &pair.refresh_token,
        config.refresh_ttl_seconds(),
        config.cookie_secure(),
    )
    .map_err(|err| ApiError::from(anyhow::Error::new(err)))?;

    headers.append(SET_COOKIE, access);
    headers.append(SET_COOKIE, refresh);
    Ok(())
}

pub(super) fn clear_token_cookies(headers: &mut HeaderMap, config: &AuthConfig) {
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        if let Ok(cookie) = clear_cookie(name, config.cookie_secure()) {
            headers.append(SET_COOKIE, cookie);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret-0123456789abcdefgh"),
            SecretString::from("refresh-secret-0123456789abcdefg"),
        )
        .with_access_ttl_seconds(3600)
        .with_refresh_ttl_seconds(7200)
    }

    #[test]
    fn token_cookie_carries_flags_and_ttl() {
        let cookie = token_cookie(ACCESS_TOKEN_COOKIE, "abc", 3600, true)
            .expect("cookie should build");
        let rendered = cookie.to_str().expect("ascii cookie");
        assert!(rendered.starts_with("accessToken=abc;"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Max-Age=3600"));
        assert!(rendered.contains("Secure"));
    }

    #[test]
    fn insecure_config_drops_secure_flag() {
        let cookie = token_cookie(REFRESH_TOKEN_COOKIE, "abc", 60, false)
            .expect("cookie should build");
        assert!(!cookie.to_str().expect("ascii cookie").contains("Secure"));
    }

    #[test]
    fn append_token_cookies_sets_both() {
        let mut headers = HeaderMap::new();
        let pair = TokenPair {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        };
        append_token_cookies(&mut headers, &config(), &pair).expect("cookies should build");

        let cookies: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("accessToken=a;"));
        assert!(cookies[1].starts_with("refreshToken=r;"));
        assert!(cookies[0].contains("Max-Age=3600"));
        assert!(cookies[1].contains("Max-Age=7200"));
    }

    #[test]
    fn clear_token_cookies_expire_immediately() {
        let mut headers = HeaderMap::new();
        clear_token_cookies(&mut headers, &config());

        let cookies: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|cookie| cookie.contains("Max-Age=0")));
    }
}
