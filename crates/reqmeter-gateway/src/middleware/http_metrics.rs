//! HTTP request metric definitions and the recording step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request};

use reqmeter_core::{MetricDef, MetricsError, Registry};

use crate::config::{MetricsSection, RouteLabel};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Label schema shared by both metrics.
pub const LABELS: [&str; 3] = ["method", "route", "status_code"];

/// `route` value for requests no route template matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

const COUNT_SLOT: usize = 0;
const DURATION_SLOT: usize = 1;

/// Handle to the two HTTP metrics inside a shared registry.
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Arc<Registry>,
    route_label: RouteLabel,
    // One flag per metric: set once its series ceiling has been reported.
    saturated: Arc<[AtomicBool; 2]>,
}

impl HttpMetrics {
    /// Register `http_requests_total` and `http_request_duration_seconds`.
    ///
    /// Fails with `DuplicateMetric` when they already exist; call
    /// [`Registry::clear`] first when re-initializing against the same registry.
    pub fn install(registry: Arc<Registry>, cfg: &MetricsSection) -> Result<Self, MetricsError> {
        registry.register(MetricDef::counter(
            REQUESTS_TOTAL,
            "Total number of HTTP requests",
            &LABELS,
        ))?;
        registry.register(MetricDef::histogram(
            REQUEST_DURATION_SECONDS,
            "Duration of HTTP requests in seconds",
            &LABELS,
            &cfg.duration_buckets,
        ))?;
        Ok(Self {
            registry,
            route_label: cfg.route_label,
            saturated: Arc::new([AtomicBool::new(false), AtomicBool::new(false)]),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The `route` label value for `req`.
    pub fn route_of(&self, req: &Request) -> String {
        match self.route_label {
            RouteLabel::RawPath => req.uri().path().to_owned(),
            RouteLabel::MatchedTemplate => req
                .extensions()
                .get::<MatchedPath>()
                .map(|m| m.as_str().to_owned())
                .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned()),
        }
    }

    /// One counter increment plus one histogram observation.
    ///
    /// Never fails: a rejected observation is logged and dropped. A full
    /// series ceiling is logged at `warn` once per metric, then at `debug`.
    pub fn record(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let labels = [("method", method), ("route", route), ("status_code", status.as_str())];

        if let Err(e) = self.registry.inc(REQUESTS_TOTAL, &labels) {
            self.dropped(COUNT_SLOT, &e, method, route);
        }
        if let Err(e) =
            self.registry
                .observe_histogram(REQUEST_DURATION_SECONDS, &labels, elapsed.as_secs_f64())
        {
            self.dropped(DURATION_SLOT, &e, method, route);
        }
    }

    fn dropped(&self, slot: usize, e: &MetricsError, method: &str, route: &str) {
        let metric = if slot == COUNT_SLOT { REQUESTS_TOTAL } else { REQUEST_DURATION_SECONDS };
        match e {
            MetricsError::CardinalityExceeded { limit, .. } => {
                if self.first_saturation(slot) {
                    tracing::warn!(
                        code = e.code().as_str(),
                        %metric,
                        limit,
                        %route,
                        "series ceiling reached, new label vectors are dropped"
                    );
                } else {
                    tracing::debug!(code = e.code().as_str(), %metric, %method, %route, "observation dropped");
                }
            }
            _ => {
                tracing::warn!(code = e.code().as_str(), %metric, %method, %route, error = %e, "observation dropped");
            }
        }
    }

    /// True only for the first caller after `slot`'s metric hit its ceiling.
    fn first_saturation(&self, slot: usize) -> bool {
        !self.saturated[slot].swap(true, Ordering::AcqRel)
    }
}
