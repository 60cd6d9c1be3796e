//! Channel subscription endpoints.
//!
//! A subscription is one row linking a subscriber account to a channel
//! account. The toggle is an existence check followed by create-or-delete.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{AuthState, gate::require_auth};
use crate::api::error::ApiError;
use crate::api::response::ApiResponse;

const CHANNEL_ID_REQUIRED: &str = "Channel ID is required";
const SUBSCRIBER_ID_REQUIRED: &str = "Subscriber ID is required";
const INVALID_ID: &str = "Invalid identifier";
const CHANNEL_NOT_FOUND: &str = "Channel does not exist";
const NO_SUBSCRIBED_CHANNELS: &str = "No channels found for the subscriber";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub id: String,
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: String,
}

#[utoipa::path(
    put,
    path = "/v1/subscriptions/{channel_id}",
    params(("channel_id" = String, Path, description = "Channel account id")),
    responses(
        (status = 200, description = "Channel unsubscribed", body = SubscriptionView),
        (status = 201, description = "Channel subscribed", body = SubscriptionView),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Channel does not exist"),
    ),
    tag = "subscriptions"
)]
pub async fn toggle(
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool, &state).await?;
    let channel_id = parse_id(&channel_id, CHANNEL_ID_REQUIRED)?;

    if !channel_exists(&pool, channel_id).await? {
        return Err(ApiError::not_found(CHANNEL_NOT_FOUND));
    }

    match delete_subscription(&pool, principal.user_id, channel_id).await? {
        Some(removed) => {
            Ok(ApiResponse::ok(removed, "Channel unsubscribed successfully").into_response())
        }
        None => {
            let created = insert_subscription(&pool, principal.user_id, channel_id).await?;
            Ok(ApiResponse::created(created, "Channel subscribed successfully").into_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/subscriptions/subscribers/{channel_id}",
    params(("channel_id" = String, Path, description = "Channel account id")),
    responses(
        (status = 200, description = "Subscriber ids for the channel"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Channel has no subscribers"),
    ),
    tag = "subscriptions"
)]
pub async fn channel_subscribers(
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool, &state).await?;
    let channel_id = parse_id(&channel_id, CHANNEL_ID_REQUIRED)?;

    let subscribers = list_subscribers(&pool, channel_id).await?;
    if subscribers.is_empty() {
        return Err(ApiError::not_found(CHANNEL_NOT_FOUND));
    }

    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully").into_response())
}

#[utoipa::path(
    get,
    path = "/v1/subscriptions/channels/{subscriber_id}",
    params(("subscriber_id" = String, Path, description = "Subscriber account id")),
    responses(
        (status = 200, description = "Channel ids the account subscribes to"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "No subscriptions for the account"),
    ),
    tag = "subscriptions"
)]
pub async fn subscribed_channels(
    Path(subscriber_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool, &state).await?;
    let subscriber_id = parse_id(&subscriber_id, SUBSCRIBER_ID_REQUIRED)?;

    let channels = list_channels(&pool, subscriber_id).await?;
    if channels.is_empty() {
        return Err(ApiError::not_found(NO_SUBSCRIBED_CHANNELS));
    }

    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully").into_response())
}

fn parse_id(raw: &str, missing_message: &str) -> Result<Uuid, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(missing_message));
    }
    Uuid::parse_str(trimmed).map_err(|_| ApiError::validation(INVALID_ID))
}

fn view_from_row(row: &sqlx::postgres::PgRow) -> SubscriptionView {
    SubscriptionView {
        id: row.get::<Uuid, _>("id").to_string(),
        subscriber_id: row.get::<Uuid, _>("subscriber_id").to_string(),
        channel_id: row.get::<Uuid, _>("channel_id").to_string(),
        created_at: row.get("created_at"),
    }
}

async fn channel_exists(pool: &PgPool, channel_id: Uuid) -> Result<bool> {
    let query = "SELECT 1 FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(channel_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check channel existence")?;
    Ok(row.is_some())
}

async fn delete_subscription(
    pool: &PgPool,
    subscriber_id: Uuid,
    channel_id: Uuid,
) -> Result<Option<SubscriptionView>> {
    let query = r"
        DELETE FROM subscriptions
        WHERE subscriber_id = $1 AND channel_id = $2
        RETURNING id, subscriber_id, channel_id, created_at::text AS created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to delete subscription")?;
    Ok(row.map(|row| view_from_row(&row)))
}

async fn insert_subscription(
    pool: &PgPool,
    subscriber_id: Uuid,
    channel_id: Uuid,
) -> Result<SubscriptionView> {
    let query = r"
        INSERT INTO subscriptions (subscriber_id, channel_id)
        VALUES ($1, $2)
        ON CONFLICT (subscriber_id, channel_id) DO UPDATE SET channel_id = EXCLUDED.channel_id
        RETURNING id, subscriber_id, channel_id, created_at::text AS created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert subscription")?;
    Ok(view_from_row(&row))
}

async fn list_subscribers(pool: &PgPool, channel_id: Uuid) -> Result<Vec<String>> {
    let query = "SELECT subscriber_id FROM subscriptions WHERE channel_id = $1 ORDER BY created_at";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(channel_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list subscribers")?;
    Ok(rows
        .iter()
        .map(|row| row.get::<Uuid, _>("subscriber_id").to_string())
        .collect())
}

async fn list_channels(pool: &PgPool, subscriber_id: Uuid) -> Result<Vec<String>> {
    let query = "SELECT channel_id FROM subscriptions WHERE subscriber_id = $1 ORDER BY created_at";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(subscriber_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list subscribed channels")?;
    Ok(rows
        .iter()
        .map(|row| row.get::<Uuid, _>("channel_id").to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_blank_and_garbage() {
        assert!(parse_id("  ", CHANNEL_ID_REQUIRED).is_err());
        assert!(parse_id("not-a-uuid", CHANNEL_ID_REQUIRED).is_err());
    }

    #[test]
    fn parse_id_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_id(&id.to_string(), CHANNEL_ID_REQUIRED).ok(),
            Some(id)
        );
    }
}
