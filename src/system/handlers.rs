use axum::{
    extract::{Extension, Json},
    http::header,
    response::IntoResponse,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::AuthedUser;
use crate::common::AppState;

/// GET /home
/// Greeting for an authenticated caller
pub async fn home(authed: AuthedUser) -> Json<Value> {
    Json(json!({
        "message": "Hello World!",
        "user": {
            "userId": authed.id,
            "username": authed.username,
        }
    }))
}

/// GET /metrics
/// Auth counters in Prometheus text format
pub async fn metrics(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    let state = state_lock.read().await.clone();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
