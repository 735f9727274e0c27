//! Structured logging.
//!
//! Everything goes through `tracing`. Route handlers log through
//! [`RouteLog`], which tags each event with the log sink's `job` label so a
//! shipper (promtail, vector, ...) tailing stdout can route it to the sink.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogSinkSection;

/// Target used for route log events.
pub const ROUTE_TARGET: &str = "reqmeter::routes";

/// Install the global fmt subscriber (`RUST_LOG`, default `info`).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

#[derive(Clone)]
pub struct RouteLog {
    job: Arc<str>,
    sink: Arc<str>,
}

impl RouteLog {
    pub fn new(sink: &LogSinkSection) -> Self {
        Self {
            job: Arc::from(sink.job.as_str()),
            sink: Arc::from(sink.endpoint()),
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn sink(&self) -> &str {
        &self.sink
    }

    pub fn info(&self, message: &str) {
        tracing::info!(target: ROUTE_TARGET, job = %self.job, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(target: ROUTE_TARGET, job = %self.job, "{message}");
    }
}
