//! Signed session tokens.
//!
//! Two token classes share one claim shape but are signed with distinct
//! secrets, so a leaked access-token key cannot forge refresh tokens and vice
//! versa. Access tokens are never persisted; refresh tokens are stored on the
//! account by the session layer.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Account id the token was issued to
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("token signing failed")]
    Signing,
}

/// Freshly issued access/refresh pair.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    /// Issue a short-lived access token for an account.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be signed.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, TokenError> {
        issue(&self.access_encoding, user_id, self.access_ttl_seconds)
    }

    /// Issue a long-lived refresh token for an account.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be signed.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        issue(&self.refresh_encoding, user_id, self.refresh_ttl_seconds)
    }

    /// Issue both tokens for one session.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if either token cannot be signed.
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id)?,
            refresh_token: self.issue_refresh(user_id)?,
        })
    }

    /// Validate an access token signature and expiry.
    ///
    /// # Errors
    /// Returns `Expired` for outdated tokens, `Invalid` otherwise.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.access_decoding, token)
    }

    /// Validate a refresh token signature and expiry.
    ///
    /// # Errors
    /// Returns `Expired` for outdated tokens, `Invalid` otherwise.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(&self.refresh_decoding, token)
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

fn issue(key: &EncodingKey, user_id: Uuid, ttl_seconds: i64) -> Result<String, TokenError> {
    let now = unix_now()?;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_seconds,
    };
    encode(&Header::default(), &claims, key).map_err(|_| TokenError::Signing)
}

fn verify(key: &DecodingKey, token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(token, key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

fn unix_now() -> Result<i64, TokenError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::Signing)?;
    i64::try_from(now.as_secs()).map_err(|_| TokenError::Signing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "access-secret-0123456789abcdefgh";
    const REFRESH_SECRET: &str = "refresh-secret-0123456789abcdefg";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(ACCESS_SECRET, REFRESH_SECRET, 3600, 7200)
    }

    /// Encode claims expired beyond the default validation leeway.
    fn expired_token(secret: &str, user_id: Uuid) -> String {
        let now = unix_now().expect("clock before unix epoch");
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now - 180,
            exp: now - 120,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding should succeed")
    }

    #[test]
    fn access_token_round_trips() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue_access(user_id).expect("issue should succeed");
        let claims = issuer.verify_access(&token).expect("verify should succeed");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn refresh_token_round_trips() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue_refresh(user_id).expect("issue should succeed");
        let claims = issuer
            .verify_refresh(&token)
            .expect("verify should succeed");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 7200);
    }

    #[test]
    fn token_classes_do_not_cross_validate() {
        let issuer = issuer();
        let pair = issuer
            .issue_pair(Uuid::new_v4())
            .expect("issue should succeed");

        assert_eq!(
            issuer.verify_refresh(&pair.access_token),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            issuer.verify_access(&pair.refresh_token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let issuer = issuer();
        let token = expired_token(REFRESH_SECRET, Uuid::new_v4());
        assert_eq!(issuer.verify_refresh(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let issuer = issuer();
        let token = issuer
            .issue_access(Uuid::new_v4())
            .expect("issue should succeed");
        let mut tampered: Vec<char> = token.chars().collect();
        let position = tampered.len() / 2;
        tampered[position] = if tampered[position] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        assert!(issuer.verify_access(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = issuer();
        let other = TokenIssuer::new(
            "another-access-secret-0123456789",
            "another-refresh-secret-01234567",
            3600,
            7200,
        );
        let token = issuer
            .issue_access(Uuid::new_v4())
            .expect("issue should succeed");
        assert_eq!(other.verify_access(&token), Err(TokenError::Invalid));
    }
}
