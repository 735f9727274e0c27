//! Response-completion hook.
//!
//! A [`CompletionGuard`] is created when the request enters the middleware
//! and records exactly once, at whichever of these happens first:
//! - the wrapped response body yields its last frame or an error,
//! - the response body is dropped (client went away, HEAD, transport done),
//! - the guard itself is dropped before any response existed (request
//!   future cancelled, handler panicked).

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::StatusCode;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use super::http_metrics::HttpMetrics;

/// Status recorded when the request ended before a response was produced.
pub const FALLBACK_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

struct Pending {
    metrics: HttpMetrics,
    method: String,
    route: String,
    started: Instant,
}

pub struct CompletionGuard {
    pending: Option<Pending>,
    status: Option<StatusCode>,
}

impl CompletionGuard {
    /// Start the monotonic timer for one request.
    pub fn start(metrics: HttpMetrics, method: String, route: String) -> Self {
        Self {
            pending: Some(Pending {
                metrics,
                method,
                route,
                started: Instant::now(),
            }),
            status: None,
        }
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_none()
    }

    /// Record the request. Only the first call has any effect.
    pub fn finish(&mut self) {
        let Some(p) = self.pending.take() else { return };
        let status = self.status.unwrap_or(FALLBACK_STATUS);
        p.metrics
            .record(&p.method, &p.route, status.as_u16(), p.started.elapsed());
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Response body decorator: forwards every call to the real body and fires
/// the guard once the body is exhausted or dropped.
pub struct InstrumentedBody {
    inner: Body,
    guard: CompletionGuard,
}

impl InstrumentedBody {
    pub fn new(inner: Body, guard: CompletionGuard) -> Self {
        Self { inner, guard }
    }
}

impl HttpBody for InstrumentedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => this.guard.finish(),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.guard.finish(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqmeter_core::Registry;

    use super::*;
    use crate::config::MetricsSection;
    use crate::middleware::http_metrics::REQUESTS_TOTAL;

    fn metrics() -> HttpMetrics {
        HttpMetrics::install(Arc::new(Registry::new()), &MetricsSection::default()).unwrap()
    }

    fn count(m: &HttpMetrics, status: &str) -> Option<u64> {
        m.registry().counter_value(
            REQUESTS_TOTAL,
            &[("method", "GET"), ("route", "/x"), ("status_code", status)],
        )
    }

    #[test]
    fn finish_twice_records_once() {
        let m = metrics();
        let mut guard = CompletionGuard::start(m.clone(), "GET".into(), "/x".into());
        guard.set_status(StatusCode::OK);
        guard.finish();
        guard.finish();
        assert!(guard.is_finished());
        drop(guard);
        assert_eq!(count(&m, "200"), Some(1));
    }

    #[test]
    fn dropped_guard_uses_fallback_status() {
        let m = metrics();
        drop(CompletionGuard::start(m.clone(), "GET".into(), "/x".into()));
        assert_eq!(count(&m, "500"), Some(1));
        assert_eq!(count(&m, "200"), None);
    }
}
