//! Request instrumentation.
//!
//! Attach with `axum::middleware::from_fn_with_state(metrics, track_requests)`
//! through `Router::layer`, so every route and the fallback are covered.
//! Each request gets one `http_requests_total` increment and one
//! `http_request_duration_seconds` observation, labelled
//! `{method, route, status_code}`, recorded when the response completes.

pub mod completion;
pub mod http_metrics;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

pub use completion::{CompletionGuard, InstrumentedBody, FALLBACK_STATUS};
pub use http_metrics::{HttpMetrics, REQUESTS_TOTAL, REQUEST_DURATION_SECONDS};

pub async fn track_requests(State(metrics): State<HttpMetrics>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let route = metrics.route_of(&req);

    // Lives in this future until the response exists, so cancellation and
    // panics below still record.
    let mut guard = CompletionGuard::start(metrics, method, route);
    let response = next.run(req).await;
    guard.set_status(response.status());

    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(InstrumentedBody::new(body, guard)))
}
