// Plain HTTP routes next to the WebSocket endpoint.

use axum::{http::StatusCode, response::IntoResponse};

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
