// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AuthConfig;
use crate::auth::{AuthService, PublicRoutes, TokenService};
use crate::services::{AuthMetrics, RateLimitService};
use crate::users::UsersService;

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: AuthConfig,
    pub token_service: Arc<TokenService>,
    pub users_service: Arc<UsersService>,
    pub auth_service: Arc<AuthService>,
    pub metrics: Arc<AuthMetrics>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub public_routes: Arc<PublicRoutes>,
}
