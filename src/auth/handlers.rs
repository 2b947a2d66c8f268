//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::extractors::AuthedUser;
use super::models::{
    AuthResponse, LoginRequest, MessageResponse, OAuthLoginRequest, RefreshResponse,
    RefreshTokenRequest,
};
use crate::common::{safe_token_log, ApiError, AppState};

/// POST /auth/login
/// Authenticates a user with username and password
///
/// # Request Body
/// ```json
/// { "username": "alice", "password": "S3cure!pass" }
/// ```
///
/// # Response
/// ```json
/// { "access_token": "...", "refresh_token": "...", "user": { ... } }
/// ```
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    info!("🔐 Received login request");

    let response = state
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(response))
}

/// POST /auth/oauth/login
/// Authenticates a user with a profile obtained from an OAuth provider
///
/// # Request Body
/// ```json
/// {
///   "provider": "google",
///   "accessToken": "<provider access token>",
///   "refreshToken": "<provider refresh token, optional>",
///   "profile": { "id": "...", "emails": [{ "value": "..." }], ... }
/// }
/// ```
pub async fn oauth_login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<OAuthLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    info!(provider = %payload.provider, "🔐 Received OAuth login request");

    let response = state.auth_service.oauth_login(payload).await?;
    Ok(Json(response))
}

/// POST /auth/refresh-token
/// Issues a new access token from a refresh token carried in the body
pub async fn refresh_token(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    info!(token = %safe_token_log(&payload.token), "Received refresh token request");

    let response = state.auth_service.refresh_token(&payload.token).await?;
    Ok(Json(response))
}

/// POST /auth/logout
/// Revokes the bearer token the request was authorized with
pub async fn logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    info!(user_id = authed.id, "Received logout request");

    let response = state.auth_service.logout(&authed.token).await?;
    Ok(Json(response))
}
