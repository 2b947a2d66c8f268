//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::service::UNAUTHENTICATED_MESSAGE;
use crate::common::ApiError;

/// Authenticated caller, placed on the request by the access gate
///
/// Handlers take this as an argument to require authentication; if the gate
/// did not run or rejected the token, extraction fails with `Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i64,
    pub username: String,
    /// The bearer token the request was authorized with
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthedUser>() {
            Some(user) => Ok(user.clone()),
            None => {
                warn!(path = %parts.uri.path(), "Protected handler reached without an authorized user");
                Err(ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()))
            }
        }
    }
}
