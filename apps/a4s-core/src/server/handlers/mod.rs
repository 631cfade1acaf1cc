// apps/a4s-core/src/server/handlers/mod.rs
pub mod agents;
pub mod channels;

use axum::response::IntoResponse;
use axum::Json;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
