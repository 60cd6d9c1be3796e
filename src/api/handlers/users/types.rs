//! Request/response types for account endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public projection of an account.
///
/// This is the only account shape that leaves the service; the password hash
/// and the stored refresh token have no field here.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn profile() -> Profile {
        Profile {
            id: "0193a1c2-0000-7000-8000-000000000000".to_string(),
            username: "abc".to_string(),
            email: "a@b.com".to_string(),
            full_name: "A B".to_string(),
            avatar_url: "https://media.clipstream.dev/a.png".to_string(),
            cover_image_url: None,
            created_at: "2026-01-01 00:00:00+00".to_string(),
            updated_at: "2026-01-01 00:00:00+00".to_string(),
        }
    }

    #[test]
    fn profile_serializes_camel_case_without_secrets() -> Result<()> {
        let value = serde_json::to_value(profile())?;
        let object = value.as_object().context("profile should be an object")?;

        assert_eq!(object["username"], "abc");
        assert_eq!(object["fullName"], "A B");
        assert!(object.contains_key("avatarUrl"));
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("refreshToken"));
        Ok(())
    }

    #[test]
    fn change_password_request_reads_camel_case() -> Result<()> {
        let request: ChangePasswordRequest =
            serde_json::from_value(serde_json::json!({
                "oldPassword": "p1",
                "newPassword": "p2",
            }))?;
        assert_eq!(request.old_password, "p1");
        assert_eq!(request.new_password, "p2");
        Ok(())
    }

    #[test]
    fn update_profile_rejects_unknown_fields() {
        let result: Result<UpdateProfileRequest, _> =
            serde_json::from_value(serde_json::json!({"password": "nope"}));
        assert!(result.is_err());
    }
}
