//! Account endpoints: registration, current-user reads, and profile updates.
//!
//! Flow Overview:
//! 1) Registration validates input, uploads the mandatory avatar to the
//!    external media store, then creates the account with a hashed password.
//! 2) Every other endpoint authenticates via the gate first, then performs a
//!    narrow field update and returns the fresh secret-free profile.

pub(crate) mod storage;
pub(crate) mod types;

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Multipart, multipart::Field},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use self::storage::{InsertOutcome, NewUser, UpdateOutcome};
use self::types::{ChangePasswordRequest, UpdateProfileRequest};
use super::auth::{AuthState, gate::require_auth, messages, password};
use super::utils::{normalize_username, valid_email};
use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::media::MediaClient;

struct FilePart {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

#[utoipa::path(
    post,
    path = "/v1/users/register",
    request_body(content_type = "multipart/form-data",
        description = "username, password, email, fullname, avatar file (required), coverImage file (optional)"),
    responses(
        (status = 201, description = "Account created", body = types::Profile),
        (status = 400, description = "Missing or invalid fields, or missing avatar"),
        (status = 409, description = "Username or email already taken"),
        (status = 500, description = "Avatar upload failed"),
    ),
    tag = "users"
)]
pub async fn register(
    pool: Extension<PgPool>,
    media: Extension<Arc<MediaClient>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut username = None;
    let mut password_field = None;
    let mut email = None;
    let mut fullname = None;
    let mut avatar = None;
    let mut cover_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation(messages::INVALID_MULTIPART))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "username" => username = Some(text_field(field).await?),
            "password" => password_field = Some(text_field(field).await?),
            "email" => email = Some(text_field(field).await?),
            "fullname" => fullname = Some(text_field(field).await?),
            "avatar" => avatar = Some(file_part(field).await?),
            "coverImage" => cover_image = Some(file_part(field).await?),
            _ => {}
        }
    }

    let username = require_text(username)?;
    let password = require_text(password_field)?;
    let email = require_text(email)?;
    let fullname = require_text(fullname)?;

    if !valid_email(&email) {
        return Err(ApiError::validation(messages::INVALID_EMAIL));
    }

    let username = normalize_username(&username);

    if storage::identity_taken(&pool, &username, &email).await? {
        return Err(ApiError::conflict(messages::USER_EXISTS));
    }

    let Some(avatar) = avatar else {
        return Err(ApiError::validation(messages::AVATAR_REQUIRED));
    };

    let avatar_url = match upload_file(&media, &avatar).await {
        Ok(url) => url,
        Err(err) => {
            error!("Avatar upload failed: {err}");
            return Err(ApiError::dependency(messages::AVATAR_UPLOAD_FAILED));
        }
    };

    // The cover is optional on registration; a failed upload is tolerated.
    let cover_image_url = match cover_image {
        Some(part) => match upload_file(&media, &part).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!("Cover image upload failed: {err}");
                None
            }
        },
        None => None,
    };

    let password_hash = password::hash_password(&password)?;

    let outcome = storage::insert_user(
        &pool,
        NewUser {
            username,
            email,
            full_name: fullname,
            password_hash,
            avatar_url,
            cover_image_url,
        },
    )
    .await?;

    match outcome {
        InsertOutcome::Created(profile) => {
            Ok(ApiResponse::created(profile, messages::REGISTER_OK).into_response())
        }
        InsertOutcome::Conflict => Err(ApiError::conflict(messages::USER_EXISTS)),
    }
}

#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Authenticated user profile", body = types::Profile),
        (status = 401, description = "Missing or invalid access token"),
    ),
    tag = "users"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;
    Ok(ApiResponse::ok(principal.profile, "Current user fetched successfully").into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = types::Profile),
        (status = 400, description = "No updates provided or invalid email"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 409, description = "Email already taken"),
    ),
    tag = "users"
)]
pub async fn update_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::validation(messages::MISSING_PAYLOAD));
    };

    let fullname = request
        .fullname
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if fullname.is_none() && email.is_none() {
        return Err(ApiError::validation(messages::NO_UPDATES_PROVIDED));
    }
    if let Some(email) = email {
        if !valid_email(email) {
            return Err(ApiError::validation(messages::INVALID_EMAIL));
        }
    }

    match storage::update_profile(&pool, principal.user_id, fullname, email).await? {
        UpdateOutcome::Updated(profile) => {
            Ok(ApiResponse::ok(profile, "Account details updated successfully").into_response())
        }
        UpdateOutcome::Conflict => Err(ApiError::conflict(messages::USER_EXISTS)),
        UpdateOutcome::NotFound => Err(ApiError::not_found(messages::USER_DOES_NOT_EXIST)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Missing fields or wrong old password"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    tag = "users"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::validation(messages::MISSING_PAYLOAD));
    };
    if request.old_password.trim().is_empty() || request.new_password.trim().is_empty() {
        return Err(ApiError::validation(messages::ALL_FIELDS_REQUIRED));
    }

    let stored_hash = storage::fetch_password_hash(&pool, principal.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(messages::USER_DOES_NOT_EXIST))?;

    if !password::verify_password(&request.old_password, &stored_hash)? {
        return Err(ApiError::validation(messages::INVALID_OLD_PASSWORD));
    }

    let new_hash = password::hash_password(&request.new_password)?;
    storage::update_password_hash(&pool, principal.user_id, &new_hash).await?;

    Ok(ApiResponse::ok(serde_json::json!({}), "Password changed successfully").into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/users/me/avatar",
    request_body(content_type = "multipart/form-data", description = "avatar file"),
    responses(
        (status = 200, description = "Avatar updated", body = types::Profile),
        (status = 400, description = "Avatar file missing"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 500, description = "Avatar upload failed"),
    ),
    tag = "users"
)]
pub async fn update_avatar(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    media: Extension<Arc<MediaClient>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;

    let Some(avatar) = file_field(multipart, "avatar").await? else {
        return Err(ApiError::validation(messages::AVATAR_REQUIRED));
    };

    let avatar_url = match upload_file(&media, &avatar).await {
        Ok(url) => url,
        Err(err) => {
            error!("Avatar upload failed: {err}");
            return Err(ApiError::dependency(messages::AVATAR_UPLOAD_FAILED));
        }
    };

    let profile = storage::update_avatar(&pool, principal.user_id, &avatar_url)
        .await?
        .ok_or_else(|| ApiError::not_found(messages::USER_DOES_NOT_EXIST))?;

    Ok(ApiResponse::ok(profile, "Avatar updated successfully").into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/users/me/cover",
    request_body(content_type = "multipart/form-data", description = "coverImage file"),
    responses(
        (status = 200, description = "Cover image updated", body = types::Profile),
        (status = 400, description = "Cover image file missing"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 500, description = "Cover image upload failed"),
    ),
    tag = "users"
)]
pub async fn update_cover_image(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    media: Extension<Arc<MediaClient>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;

    let Some(cover) = file_field(multipart, "coverImage").await? else {
        return Err(ApiError::validation(messages::COVER_REQUIRED));
    };

    let cover_url = match upload_file(&media, &cover).await {
        Ok(url) => url,
        Err(err) => {
            error!("Cover image upload failed: {err}");
            return Err(ApiError::dependency(messages::COVER_UPLOAD_FAILED));
        }
    };

    let profile = storage::update_cover_image(&pool, principal.user_id, &cover_url)
        .await?
        .ok_or_else(|| ApiError::not_found(messages::USER_DOES_NOT_EXIST))?;

    Ok(ApiResponse::ok(profile, "Cover image updated successfully").into_response())
}

async fn upload_file(media: &MediaClient, part: &FilePart) -> anyhow::Result<String> {
    let uploaded = media
        .upload(&part.file_name, &part.content_type, part.bytes.to_vec())
        .await?;
    Ok(uploaded.url)
}

async fn text_field(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|_| ApiError::validation(messages::INVALID_MULTIPART))
}

async fn file_part(field: Field<'_>) -> Result<FilePart, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|_| ApiError::validation(messages::INVALID_MULTIPART))?;
    Ok(FilePart {
        file_name,
        content_type,
        bytes,
    })
}

/// First file field with the given name, draining the rest of the stream.
async fn file_field(
    mut multipart: Multipart,
    target: &str,
) -> Result<Option<FilePart>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation(messages::INVALID_MULTIPART))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        if name == target {
            return Ok(Some(file_part(field).await?));
        }
    }
    Ok(None)
}

fn require_text(value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation(messages::ALL_FIELDS_REQUIRED))
}

#[cfg(test)]
mod tests {
    use super::require_text;

    #[test]
    fn require_text_trims_and_rejects_empty() {
        assert_eq!(
            require_text(Some(" abc ".to_string())).ok(),
            Some("abc".to_string())
        );
        assert!(require_text(Some("   ".to_string())).is_err());
        assert!(require_text(None).is_err());
    }
}
