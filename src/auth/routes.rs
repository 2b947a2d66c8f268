//! Authentication routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /auth/login` - Username/password login (public)
/// - `POST /auth/oauth/login` - OAuth profile login (public)
/// - `POST /auth/refresh-token` - New access token from a refresh token (public)
/// - `POST /auth/logout` - Revoke the current bearer token
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/oauth/login", post(handlers::oauth_login))
        .route("/auth/refresh-token", post(handlers::refresh_token))
        .route("/auth/logout", post(handlers::logout))
}
