//! Health / heartbeat endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "..."}` with HTTP 200. Does not
/// contact the upstream.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
