use axum::{routing::get, Router};

use super::handlers;

/// Creates the router for `/home` and `/metrics`
pub fn system_routes() -> Router {
    Router::new()
        .route("/home", get(handlers::home))
        .route("/metrics", get(handlers::metrics))
}
