use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness check: 200 whenever the process can answer HTTP.
pub async fn live() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")})),
    )
}
