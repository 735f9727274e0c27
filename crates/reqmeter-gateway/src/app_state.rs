//! Shared application state.
//!
//! The registry is created here (or passed in) and injected into the
//! middleware and the exporter; there is no global registry.

use std::sync::Arc;
use std::time::Duration;

use reqmeter_core::{Registry, RegistryOptions};

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::middleware::HttpMetrics;
use crate::obs::RouteLog;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    http_metrics: HttpMetrics,
    log: RouteLog,
}

impl AppState {
    /// Build state around a fresh registry sized from `cfg.metrics`.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let registry = Arc::new(Registry::with_options(RegistryOptions {
            max_series_per_metric: cfg.metrics.max_series_per_metric,
            process_metrics: cfg.metrics.process_metrics,
        }));
        Self::with_registry(cfg, registry)
    }

    /// Build state around an existing registry. Fails with
    /// `DuplicateMetric` if the HTTP metrics are already registered there.
    pub fn with_registry(cfg: GatewayConfig, registry: Arc<Registry>) -> Result<Self> {
        let http_metrics = HttpMetrics::install(registry, &cfg.metrics)?;
        let log = RouteLog::new(&cfg.log_sink);
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                http_metrics,
                log,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.inner.http_metrics.registry()
    }

    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.inner.http_metrics
    }

    pub fn log(&self) -> &RouteLog {
        &self.inner.log
    }

    pub fn heavy_task_delay(&self) -> Duration {
        Duration::from_millis(self.inner.cfg.gateway.heavy_task_delay_ms)
    }
}
