use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness check. Answers 200 with or without an engine so health checks pass
/// before the first upload; `checks.engine` tells the two apart.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.session.snapshot().await;
    let engine = if state.session.is_ready().await {
        "ready"
    } else {
        "empty"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "checks": { "engine": engine },
            "session": snapshot,
        })),
    )
}
