//! Operational HTTP endpoints.
//!
//! - `/health`  : liveness, JSON with timestamp
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use reqmeter_core::TEXT_CONTENT_TYPE;

use crate::app_state::AppState;
use crate::routes::timestamp;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    state.log().info("Health check endpoint hit");
    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "message": "Server is healthy",
            "timestamp": timestamp(),
        })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    snapshot_response(state.registry().snapshot())
}

/// Turn a rendered snapshot into the scrape response. A failed render is a
/// 500 with a JSON body; no partial text is ever returned.
pub fn snapshot_response(snapshot: reqmeter_core::Result<String>) -> Response {
    match snapshot {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "metrics snapshot failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "ERROR",
                    "message": "Failed to fetch metrics",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
