//! Service wiring and router composition

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware, Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, AuthService, RevocationCache, TokenService};
use crate::common::{AppState, AuthConfig};
use crate::logging_middleware;
use crate::rate_limit_middleware::rate_limit_middleware;
use crate::services::{AuthMetrics, RateLimitConfig, RateLimitService};
use crate::system;
use crate::users::{self, SqliteCredentialStore, UsersService};

/// Build every service over the given pool and revocation cache
pub fn build_state(
    db: SqlitePool,
    config: AuthConfig,
    cache: Arc<dyn RevocationCache>,
    rate_limit: RateLimitConfig,
) -> AppState {
    let metrics = Arc::new(AuthMetrics::new());
    let token_service = Arc::new(TokenService::new(&config, cache));
    let store = Arc::new(SqliteCredentialStore::new(
        db.clone(),
        config.operation_timeout,
    ));
    let users_service = Arc::new(UsersService::new(store, token_service.clone()));
    let auth_service = Arc::new(AuthService::new(
        users_service.clone(),
        token_service.clone(),
        metrics.clone(),
    ));

    AppState {
        db,
        config,
        token_service,
        users_service,
        auth_service,
        metrics,
        rate_limit_service: Arc::new(RateLimitService::new(rate_limit)),
        public_routes: Arc::new(auth::default_public_routes()),
    }
}

/// Origins from a comma-separated list
pub fn parse_cors_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect()
}

/// Compose all routes with the gate, throttling, CORS and tracing layers
pub fn build_router(state: AppState, cors_origins: Vec<HeaderValue>) -> Router {
    let rate_limit_service = state.rate_limit_service.clone();
    let shared = Arc::new(RwLock::new(state));

    Router::new()
        .merge(auth::auth_routes())
        .merge(users::users_routes())
        .merge(system::system_routes())
        // Innermost first: body logging, then the access gate, then throttling
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(middleware::from_fn(auth::auth_gate))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(rate_limit_service))
        .layer(Extension(shared))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
}
