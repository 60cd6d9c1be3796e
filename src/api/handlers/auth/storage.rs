//! Database helpers for credentials and the stored refresh token.
//!
//! The refresh-token writes are deliberately narrow single-field updates;
//! nothing here rewrites a whole account row.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::api::handlers::users::storage::{PROFILE_COLUMNS, profile_from_row};
use crate::api::handlers::users::types::Profile;

/// Credential row loaded for login: the profile plus the stored hash.
pub(crate) struct AuthRecord {
    pub(crate) user_id: Uuid,
    pub(crate) password_hash: String,
    pub(crate) profile: Profile,
}

/// Look up an account by username or email.
pub(crate) async fn find_by_identity(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<AuthRecord>> {
    let query = format!(
        r"
        SELECT password_hash, {PROFILE_COLUMNS}
        FROM users
        WHERE ($1::text IS NOT NULL AND username = $1)
           OR ($2::text IS NOT NULL AND email = $2)
        LIMIT 1
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    let row = sqlx::query(&query)
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up account by identity")?;

    Ok(row.map(|row| AuthRecord {
        user_id: row.get("id"),
        password_hash: row.get("password_hash"),
        profile: profile_from_row(&row),
    }))
}

pub(crate) async fn user_exists(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = "SELECT 1 FROM users WHERE id = $1";
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
        .context("failed to check account existence")?;

    Ok(row.is_some())
}

/// Persist a newly issued refresh token, replacing any prior value.
///
/// Overwriting is what enforces one active session per account.
pub(crate) async fn set_refresh_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<()> {
    let query = "UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to persist refresh token")?;
    Ok(())
}

/// Swap the stored refresh token, conditional on the expected current value.
///
/// Returns `false` when the presented token is not the most recently issued
/// one (already rotated, replaced by a newer login, or cleared by logout).
/// The compare and the overwrite are one statement, so two rotations racing
/// on the same stale token cannot both win.
pub(crate) async fn rotate_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    current: &str,
    next: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET refresh_token = $3, updated_at = NOW()
        WHERE id = $1
          AND refresh_token = $2
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(current)
        .bind(next)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to rotate refresh token")?;

    Ok(row.is_some())
}

/// Clear the stored refresh token. A no-op when none is stored.
pub(crate) async fn clear_refresh_token(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear refresh token")?;
    Ok(())
}
