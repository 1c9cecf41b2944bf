//! API request handlers.

pub mod admin;
pub mod public;
pub mod waiters;
pub mod webhook;

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "status": "healthy",
        "service": "mipropina"
    }))
}
