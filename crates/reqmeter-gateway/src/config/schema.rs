use serde::Deserialize;

use reqmeter_core::registry::{DEFAULT_DURATION_BUCKETS, DEFAULT_MAX_SERIES_PER_METRIC};

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub log_sink: LogSinkSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            metrics: MetricsSection::default(),
            log_sink: LogSinkSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GatewayError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.metrics.validate()?;
        self.log_sink.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Artificial delay of `GET /heavy-task`.
    #[serde(default = "default_heavy_task_delay_ms")]
    pub heavy_task_delay_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            heavy_task_delay_ms: default_heavy_task_delay_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(GatewayError::BadRequest(format!(
                "gateway.listen must be a valid socket address, got {:?}",
                self.listen
            )));
        }
        if self.heavy_task_delay_ms > 60_000 {
            return Err(GatewayError::BadRequest(
                "gateway.heavy_task_delay_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_heavy_task_delay_ms() -> u64 {
    5000
}

/// Which value the `route` label carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteLabel {
    /// The request path verbatim. Unbounded for parameterized or unmatched paths.
    #[default]
    RawPath,
    /// The matched route template (e.g. `/users/:id`); `unmatched` on fallback.
    MatchedTemplate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub route_label: RouteLabel,

    /// Distinct label vectors allowed per metric; 0 disables the ceiling.
    #[serde(default = "default_max_series_per_metric")]
    pub max_series_per_metric: usize,

    #[serde(default = "default_process_metrics")]
    pub process_metrics: bool,

    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            route_label: RouteLabel::default(),
            max_series_per_metric: default_max_series_per_metric(),
            process_metrics: default_process_metrics(),
            duration_buckets: default_duration_buckets(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if self.duration_buckets.is_empty() {
            return Err(GatewayError::BadRequest(
                "metrics.duration_buckets must not be empty".into(),
            ));
        }
        if self.duration_buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(GatewayError::BadRequest(
                "metrics.duration_buckets must be finite and positive".into(),
            ));
        }
        if self.duration_buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GatewayError::BadRequest(
                "metrics.duration_buckets must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_series_per_metric() -> usize {
    DEFAULT_MAX_SERIES_PER_METRIC
}
fn default_process_metrics() -> bool {
    true
}
fn default_duration_buckets() -> Vec<f64> {
    DEFAULT_DURATION_BUCKETS.to_vec()
}

/// Where route log events are shipped. The transport itself lives outside
/// this process; the gateway only tags events with the sink identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSinkSection {
    #[serde(default = "default_sink_host")]
    pub host: String,

    #[serde(default = "default_sink_port")]
    pub port: u16,

    #[serde(default = "default_sink_job")]
    pub job: String,
}

impl Default for LogSinkSection {
    fn default() -> Self {
        Self {
            host: default_sink_host(),
            port: default_sink_port(),
            job: default_sink_job(),
        }
    }
}

impl LogSinkSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(GatewayError::BadRequest("log_sink.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(GatewayError::BadRequest("log_sink.port must not be 0".into()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_sink_host() -> String {
    "localhost".into()
}
fn default_sink_port() -> u16 {
    3100
}
fn default_sink_job() -> String {
    "reqmeter".into()
}
