//! Database helpers for account records.
//!
//! Every projection selected here is the secret-free [`Profile`] column set;
//! the password hash is only ever fetched on the dedicated credential paths.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::types::Profile;
use crate::api::handlers::utils::is_unique_violation;

/// Secret-free column set shared by every profile read.
pub(crate) const PROFILE_COLUMNS: &str = "id, username, email, full_name, avatar_url, \
     cover_image_url, created_at::text AS created_at, updated_at::text AS updated_at";

pub(crate) fn profile_from_row(row: &PgRow) -> Profile {
    Profile {
        id: row.get::<Uuid, _>("id").to_string(),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        avatar_url: row.get("avatar_url"),
        cover_image_url: row.get("cover_image_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Outcome when attempting to create an account.
#[derive(Debug)]
pub(crate) enum InsertOutcome {
    Created(Profile),
    Conflict,
}

/// Outcome of a profile field update.
#[derive(Debug)]
pub(crate) enum UpdateOutcome {
    Updated(Profile),
    Conflict,
    NotFound,
}

pub(crate) struct NewUser {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) password_hash: String,
    pub(crate) avatar_url: String,
    pub(crate) cover_image_url: Option<String>,
}

pub(crate) async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>> {
    let query = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch profile")?;

    Ok(row.map(|row| profile_from_row(&row)))
}

pub(crate) async fn identity_taken(pool: &PgPool, username: &str, email: &str) -> Result<bool> {
    let query = "SELECT 1 FROM users WHERE username = $1 OR email = $2 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check identity uniqueness")?;

    Ok(row.is_some())
}

pub(crate) async fn insert_user(pool: &PgPool, user: NewUser) -> Result<InsertOutcome> {
    let query = format!(
        r"
        INSERT INTO users
            (username, email, full_name, password_hash, avatar_url, cover_image_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PROFILE_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(&user.cover_image_url)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertOutcome::Created(profile_from_row(&row))),
        // Insert races with the pre-check; the unique index is the arbiter.
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<UpdateOutcome> {
    let query = format!(
        r"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PROFILE_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(UpdateOutcome::Updated(profile_from_row(&row))),
        Ok(None) => Ok(UpdateOutcome::NotFound),
        Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::Conflict),
        Err(err) => Err(err).context("failed to update profile"),
    }
}

pub(crate) async fn fetch_password_hash(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch password hash")?;

    Ok(row.map(|row| row.get("password_hash")))
}

pub(crate) async fn update_password_hash(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;
    Ok(())
}

pub(crate) async fn update_avatar(
    pool: &PgPool,
    user_id: Uuid,
    avatar_url: &str,
) -> Result<Option<Profile>> {
    let query = format!(
        "UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(avatar_url)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update avatar")?;

    Ok(row.map(|row| profile_from_row(&row)))
}

pub(crate) async fn update_cover_image(
    pool: &PgPool,
    user_id: Uuid,
    cover_image_url: &str,
) -> Result<Option<Profile>> {
    let query = format!(
        "UPDATE users SET cover_image_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(cover_image_url)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update cover image")?;

    Ok(row.map(|row| profile_from_row(&row)))
}
