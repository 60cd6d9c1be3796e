//! Request/response types for session endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::handlers::users::types::Profile;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: Profile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Body fallback for clients that do not send the refresh cookie.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn login_request_allows_either_identity() -> Result<()> {
        let request: LoginRequest =
            serde_json::from_value(serde_json::json!({"email": "a@b.com", "password": "p1"}))?;
        assert_eq!(request.username, None);
        assert_eq!(request.email.as_deref(), Some("a@b.com"));
        Ok(())
    }

    #[test]
    fn refresh_request_reads_camel_case_field() -> Result<()> {
        let request: RefreshRequest =
            serde_json::from_value(serde_json::json!({"refreshToken": "token"}))?;
        assert_eq!(request.refresh_token.as_deref(), Some("token"));
        Ok(())
    }

    #[test]
    fn refresh_response_writes_camel_case_fields() -> Result<()> {
        let value = serde_json::to_value(RefreshResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        })?;
        assert_eq!(value["accessToken"], "a");
        assert_eq!(value["refreshToken"], "r");
        Ok(())
    }
}
