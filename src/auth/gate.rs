//! Access gate for protected routes
//!
//! Routes that need no token are listed in a `PublicRoutes` table; everything
//! else must carry a valid, unrevoked bearer token.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::extractors::AuthedUser;
use super::service::UNAUTHENTICATED_MESSAGE;
use crate::common::{ApiError, AppState};

/// (method, exact path) pairs reachable without authentication
#[derive(Debug, Clone, Default)]
pub struct PublicRoutes {
    routes: HashSet<(Method, String)>,
}

impl PublicRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, method: Method, path: &str) -> Self {
        self.routes.insert((method, path.to_string()));
        self
    }

    pub fn is_public(&self, method: &Method, path: &str) -> bool {
        self.routes.contains(&(method.clone(), path.to_string()))
    }
}

/// The application's public endpoints
pub fn default_public_routes() -> PublicRoutes {
    PublicRoutes::new()
        .allow(Method::POST, "/auth/login")
        .allow(Method::POST, "/auth/oauth/login")
        .allow(Method::POST, "/auth/refresh-token")
        .allow(Method::POST, "/users/register")
        .allow(Method::GET, "/metrics")
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Gate middleware. On success the caller's identity is attached to the
/// request as an `AuthedUser` extension.
pub async fn auth_gate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if method == Method::OPTIONS || state.public_routes.is_public(&method, &path) {
        return Ok(next.run(request).await);
    }

    let Some(token) = bearer_token(request.headers()) else {
        warn!(path = %path, "Authorization header is missing or malformed");
        return Err(ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()));
    };

    let claims = state.auth_service.authorize_bearer(&token).await?;
    let Some(user_id) = claims.user_id() else {
        return Err(ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()));
    };

    debug!(user_id = user_id, path = %path, "Request authorized");
    request.extensions_mut().insert(AuthedUser {
        id: user_id,
        username: claims.username,
        token,
    });

    Ok(next.run(request).await)
}
