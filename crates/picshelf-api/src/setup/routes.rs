//! Route configuration and setup

use crate::constants::API_PREFIX;
use crate::handlers::{health, profile_pic, users};
use crate::middleware::{
    rate_limit_middleware, request_log_middleware, strip_trailing_slash, HttpRateLimiter,
};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use picshelf_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let rate_limiter = setup_rate_limiter(config);

    let upload_routes = Router::new()
        .route("/user/profilePic", post(profile_pic::upload_profile_pic))
        .route(
            "/user/profilePic/{userId}",
            post(profile_pic::upload_user_profile_pic),
        )
        .layer(DefaultBodyLimit::max(config.upload_max_bytes));

    let api_routes = Router::new()
        .route("/ping", get(health::ping))
        .route("/user/create", post(users::create_user))
        .route("/user/update/{userId}", put(users::update_user))
        .route("/user/delete/{userId}", delete(users::delete_user))
        .route("/user/{userId}", get(users::get_user))
        .route("/user", get(users::list_users))
        .merge(upload_routes);

    let app = Router::new()
        .route("/", get(health::root))
        .nest(API_PREFIX, api_routes)
        .fallback(health::not_found)
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .layer(TimeoutLayer::new(config.http_timeout()))
        .layer(cors)
        .layer(axum::middleware::from_fn(request_log_middleware))
        .with_state(state);

    // Path rewriting has to happen before the inner router matches.
    let app = Router::new().fallback_service(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(strip_trailing_slash))
            .service(app),
    );

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Setup rate limiter with periodic cleanup task
fn setup_rate_limiter(config: &Config) -> Arc<HttpRateLimiter> {
    let window = Duration::from_secs(config.http_rate_limit_window_secs);
    let rate_limiter = Arc::new(HttpRateLimiter::new(
        config.http_rate_limit_requests,
        window,
    ));

    tracing::info!(
        limit = config.http_rate_limit_requests,
        window_secs = config.http_rate_limit_window_secs,
        "HTTP rate limiting enabled"
    );

    // Start periodic cleanup task to prevent memory leak from expired buckets
    let rate_limiter_for_cleanup = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter_for_cleanup.cleanup_expired_buckets().await;
        }
    });

    rate_limiter
}
