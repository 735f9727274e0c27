//! Axum router wiring.

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::{app_state::AppState, middleware::track_requests, ops, routes};

/// Paths served by [`build_router`], for startup logging.
pub const ROUTES: [&str; 4] = ["/metrics", "/health", "/error", "/heavy-task"];

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(ops::metrics))
        .route("/health", get(ops::health))
        .route("/error", get(routes::error))
        .route("/heavy-task", get(routes::heavy_task))
        .fallback(routes::not_found)
        // after the fallback, so unmatched requests are measured too
        .layer(from_fn_with_state(state.http_metrics().clone(), track_requests))
        .with_state(state)
}
