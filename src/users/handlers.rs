//! User handlers: registration, lookup and password change

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{ChangePasswordRequest, CreateUserRequest, UserInfo};
use crate::auth::models::MessageResponse;
use crate::auth::AuthedUser;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::services::metrics::AuthEvent;

/// POST /users/register
/// Creates a password-based account
///
/// # Request Body
/// ```json
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "S3cure!pass",
///   "firstname": "Alice",
///   "lastname": "Smith"
/// }
/// ```
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserInfo>), ApiError> {
    let state = state_lock.read().await.clone();
    state.metrics.record(AuthEvent::UserRequest);
    state.metrics.record(AuthEvent::UserCreation);
    info!(email = %safe_email_log(&payload.email), "Received registration request");

    let user = state.users_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

/// GET /users/:id
pub async fn find_by_id(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserInfo>, ApiError> {
    let state = state_lock.read().await.clone();
    state.metrics.record(AuthEvent::UserRequest);
    state.metrics.record(AuthEvent::UserFindById);

    let user = state.users_service.find_by_id(id).await?;
    Ok(Json(UserInfo::from(user)))
}

/// POST /users/change-password
/// Changes the caller's own password
///
/// # Request Body
/// ```json
/// {
///   "currentPassword": "...",
///   "newPassword": "...",
///   "newPasswordConfirm": "..."
/// }
/// ```
pub async fn change_password(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    state.metrics.record(AuthEvent::UserRequest);

    state
        .users_service
        .change_password(authed.id, payload)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}
