//! End-to-end request instrumentation through the router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use reqmeter_core::{MetricsError, Registry};
use reqmeter_gateway::app_state::AppState;
use reqmeter_gateway::config::{GatewayConfig, MetricsSection, RouteLabel};
use reqmeter_gateway::middleware::{
    track_requests, HttpMetrics, REQUESTS_TOTAL, REQUEST_DURATION_SECONDS,
};
use reqmeter_gateway::{ops, router::build_router};

fn test_cfg(heavy_task_delay_ms: u64) -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.gateway.heavy_task_delay_ms = heavy_task_delay_ms;
    cfg.metrics.process_metrics = false;
    cfg
}

fn app(cfg: GatewayConfig) -> (Router, Arc<Registry>) {
    let state = AppState::new(cfg).unwrap();
    let registry = Arc::clone(state.registry());
    (build_router(state), registry)
}

fn get_req(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

async fn send(router: &Router, path: &str) -> (StatusCode, Bytes) {
    let resp = router.clone().oneshot(get_req(path)).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body)
}

fn labels<'a>(route: &'a str, status: &'a str) -> [(&'static str, &'a str); 3] {
    [("method", "GET"), ("route", route), ("status_code", status)]
}

#[tokio::test]
async fn health_records_one_request() {
    let (router, registry) = app(test_cfg(0));
    let (status, body) = send(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["message"], "Server is healthy");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));

    let l = labels("/health", "200");
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &l), Some(1));
    let h = registry.histogram_value(REQUEST_DURATION_SECONDS, &l).unwrap();
    assert_eq!(h.count, 1);
    assert!(h.sum >= 0.0);
}

#[tokio::test]
async fn error_route_records_500() {
    let (router, registry) = app(test_cfg(0));
    let (status, body) = send(&router, "/error").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["error"], "Something went wrong!");

    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/error", "500")), Some(1));
}

#[tokio::test]
async fn heavy_task_duration_covers_delay() {
    let (router, registry) = app(test_cfg(300));
    let (status, body) = send(&router, "/heavy-task").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["duration"], "300ms");

    let h = registry
        .histogram_value(REQUEST_DURATION_SECONDS, &labels("/heavy-task", "200"))
        .unwrap();
    assert_eq!(h.count, 1);
    assert!(h.sum >= 0.3, "observed {}s", h.sum);
    assert!(h.sum < 0.3 + 2.0, "observed {}s", h.sum);
    // 0.3s lands in le=0.5 and above, not le=0.1
    assert_eq!(h.buckets[0], 0);
    assert_eq!(h.buckets[1], 1);
}

#[tokio::test]
async fn metrics_snapshot_lists_every_hit_series() {
    let (router, _registry) = app(test_cfg(10));
    send(&router, "/health").await;
    send(&router, "/error").await;
    send(&router, "/heavy-task").await;

    let resp = router.clone().oneshot(get_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for line in [
        "http_requests_total{method=\"GET\",route=\"/health\",status_code=\"200\"} 1",
        "http_requests_total{method=\"GET\",route=\"/error\",status_code=\"500\"} 1",
        "http_requests_total{method=\"GET\",route=\"/heavy-task\",status_code=\"200\"} 1",
        "http_request_duration_seconds_count{method=\"GET\",route=\"/heavy-task\",status_code=\"200\"} 1",
    ] {
        assert!(text.contains(line), "missing {line:?} in:\n{text}");
    }
}

#[tokio::test]
async fn unknown_route_is_404_without_preallocation() {
    let (router, registry) = app(test_cfg(0));
    let (status, body) = send(&router, "/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "NOT_FOUND");
    assert_eq!(json["path"], "/does-not-exist");

    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/does-not-exist", "404")), Some(1));
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/health", "200")), None);
    assert_eq!(registry.series_count(REQUESTS_TOTAL), 1);
    assert_eq!(registry.series_count(REQUEST_DURATION_SECONDS), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_counted_exactly() {
    let (router, registry) = app(test_cfg(0));
    let n = 200;

    let tasks: Vec<_> = (0..n)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move { send(&router, "/health").await })
        })
        .collect();
    for t in tasks {
        let (status, _) = t.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let l = labels("/health", "200");
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &l), Some(n));
    assert_eq!(registry.histogram_value(REQUEST_DURATION_SECONDS, &l).unwrap().count, n);
}

#[tokio::test]
async fn recorded_when_body_completes() {
    let (router, registry) = app(test_cfg(0));
    let l = labels("/health", "200");

    let resp = router.clone().oneshot(get_req("/health")).await.unwrap();
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &l), None);

    to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &l), Some(1));
}

#[tokio::test]
async fn dropped_body_records_once() {
    let (router, registry) = app(test_cfg(0));
    let resp = router.clone().oneshot(get_req("/error")).await.unwrap();
    drop(resp);

    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/error", "500")), Some(1));
    assert_eq!(registry.series_count(REQUESTS_TOTAL), 1);
}

#[tokio::test]
async fn cancelled_request_records_fallback_status() {
    let (router, registry) = app(test_cfg(10_000));
    let res = tokio::time::timeout(
        Duration::from_millis(50),
        router.clone().oneshot(get_req("/heavy-task")),
    )
    .await;
    assert!(res.is_err(), "request should still be sleeping");

    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/heavy-task", "500")), Some(1));
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/heavy-task", "200")), None);
}

async fn boom() -> &'static str {
    panic!("handler blew up")
}

#[tokio::test]
async fn panicking_handler_still_records() {
    let registry = Arc::new(Registry::new());
    let metrics = HttpMetrics::install(Arc::clone(&registry), &MetricsSection::default()).unwrap();
    let router: Router = Router::new()
        .route("/boom", get(boom))
        .layer(from_fn_with_state(metrics, track_requests));

    let joined = tokio::spawn(router.oneshot(get_req("/boom"))).await;
    assert!(joined.unwrap_err().is_panic());

    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/boom", "500")), Some(1));
}

#[tokio::test]
async fn matched_template_bounds_unmatched_paths() {
    let mut cfg = test_cfg(0);
    cfg.metrics.route_label = RouteLabel::MatchedTemplate;
    let (router, registry) = app(cfg);

    send(&router, "/health").await;
    send(&router, "/a").await;
    send(&router, "/b/c").await;

    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/health", "200")), Some(1));
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("unmatched", "404")), Some(2));
    assert_eq!(registry.series_count(REQUESTS_TOTAL), 2);
}

#[tokio::test]
async fn series_ceiling_never_breaks_responses() {
    let mut cfg = test_cfg(0);
    cfg.metrics.max_series_per_metric = 1;
    let (router, registry) = app(cfg);

    send(&router, "/health").await;
    let (status, _) = send(&router, "/other").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(registry.series_count(REQUESTS_TOTAL), 1);
    assert_eq!(registry.counter_value(REQUESTS_TOTAL, &labels("/other", "404")), None);
}

#[test]
fn reinstall_needs_clear() {
    let registry = Arc::new(Registry::new());
    AppState::with_registry(test_cfg(0), Arc::clone(&registry)).unwrap();

    let err = AppState::with_registry(test_cfg(0), Arc::clone(&registry))
        .err()
        .expect("duplicate registration");
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");

    registry.clear();
    AppState::with_registry(test_cfg(0), registry).expect("clear allows re-init");
}

#[tokio::test]
async fn failed_snapshot_is_a_json_500() {
    let resp = ops::snapshot_response(Err(MetricsError::SnapshotRender("lock poisoned".into())));
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["message"], "Failed to fetch metrics");
    assert!(json["error"].as_str().unwrap().contains("lock poisoned"));
}
