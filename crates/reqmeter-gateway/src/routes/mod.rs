//! Demo routes that exercise the instrumentation: a failing route, a slow
//! route and the JSON 404 fallback.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::app_state::AppState;

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub async fn error(State(state): State<AppState>) -> impl IntoResponse {
    state.log().error("Error endpoint hit");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "status": "ERROR",
            "message": "This is a test error route",
            "error": "Something went wrong!",
            "timestamp": timestamp(),
        })),
    )
}

pub async fn heavy_task(State(state): State<AppState>) -> impl IntoResponse {
    state.log().info("Heavy task endpoint hit");
    let delay = state.heavy_task_delay();
    tokio::time::sleep(delay).await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "message": format!("Heavy task completed after {} seconds", delay.as_secs_f64()),
            "duration": format!("{}ms", delay.as_millis()),
            "timestamp": timestamp(),
        })),
    )
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "NOT_FOUND",
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}
