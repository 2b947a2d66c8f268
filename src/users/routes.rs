use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates the users router
pub fn users_routes() -> Router {
    Router::new()
        .route("/users/register", post(handlers::register))
        .route("/users/change-password", post(handlers::change_password))
        .route("/users/:id", get(handlers::find_by_id))
}
