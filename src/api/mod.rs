use crate::media::{MediaClient, MediaConfig};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, patch, post, put},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod error;
pub mod handlers;
pub mod response;

use handlers::{auth, health, subscriptions, users};

// Multipart uploads (avatar, cover) need more room than JSON bodies.
const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::register,
        auth::session::login,
        auth::session::logout,
        auth::session::refresh_token,
        users::get_me,
        users::update_profile,
        users::change_password,
        users::update_avatar,
        users::update_cover_image,
        subscriptions::toggle,
        subscriptions::channel_subscribers,
        subscriptions::subscribed_channels,
    ),
    components(schemas(
        users::types::Profile,
        users::types::UpdateProfileRequest,
        users::types::ChangePasswordRequest,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::RefreshRequest,
        auth::types::RefreshResponse,
        subscriptions::SubscriptionView,
    )),
    tags(
        (name = "clipstream", description = "User management and channel subscription API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: auth::AuthConfig,
    media_config: MediaConfig,
    cors_origin: Option<String>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let auth_state = Arc::new(auth::AuthState::new(auth_config));
    let media = Arc::new(MediaClient::new(&media_config)?);

    let cors = cors_layer(cors_origin.as_deref())?;

    let app = Router::new()
        .route("/", get(|| async { "📼" }))
        .route("/v1/users/register", post(users::register))
        .route("/v1/users/login", post(auth::session::login))
        .route("/v1/users/logout", post(auth::session::logout))
        .route(
            "/v1/users/refresh-token",
            post(auth::session::refresh_token),
        )
        .route(
            "/v1/users/me",
            get(users::get_me).patch(users::update_profile),
        )
        .route("/v1/users/me/password", post(users::change_password))
        .route("/v1/users/me/avatar", patch(users::update_avatar))
        .route("/v1/users/me/cover", patch(users::update_cover_image))
        .route("/v1/subscriptions/:channel_id", put(subscriptions::toggle))
        .route(
            "/v1/subscriptions/subscribers/:channel_id",
            get(subscriptions::channel_subscribers),
        )
        .route(
            "/v1/subscriptions/channels/:subscriber_id",
            get(subscriptions::subscribed_channels),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(Extension(auth_state.clone()))
                .layer(Extension(media.clone()))
                .layer(Extension(pool.clone())),
        )
        .route("/health", get(health::health).options(health::health))
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH]);

    // Cookie-based sessions need credentials, which CORS only allows with an
    // exact origin.
    match origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin: {origin}"))?;
            Ok(layer
                .allow_origin(AllowOrigin::exact(origin))
                .allow_credentials(true))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
