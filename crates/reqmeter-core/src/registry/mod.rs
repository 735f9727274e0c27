//! In-process metric registry.
//!
//! Definitions are keyed by name in a `DashMap`; each metric owns its own
//! `DashMap` of series keyed by label values in schema order. Series are
//! created lazily on first observation and live until [`Registry::clear`].
//!
//! Counters are plain atomics. Histogram series sit behind a per-series
//! mutex so a snapshot never sees bucket counts that disagree with `count`.
//!
//! Label values are taken as given. A caller that passes raw request paths
//! as a label owns the resulting cardinality; the registry only enforces a
//! per-metric series ceiling so memory stays bounded.

mod definition;
mod render;
mod series;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{MetricsError, Result};
use crate::process::{ProcessCollector, PROCESS_METRIC_NAMES};

pub use definition::{MetricDef, MetricKind, DEFAULT_DURATION_BUCKETS};
pub use series::HistogramSnapshot;

use series::{CounterSeries, HistogramSeries, LabelValues, Series};

/// Content type of the text exposition format produced by [`Registry::snapshot`].
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Default ceiling on distinct label vectors per metric.
pub const DEFAULT_MAX_SERIES_PER_METRIC: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Maximum series per metric; `0` disables the ceiling.
    pub max_series_per_metric: usize,
    /// Append process metrics (cpu, memory, uptime, fds) to every snapshot.
    pub process_metrics: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            max_series_per_metric: DEFAULT_MAX_SERIES_PER_METRIC,
            process_metrics: false,
        }
    }
}

struct Metric {
    def: MetricDef,
    series: DashMap<LabelValues, Series>,
    series_len: AtomicUsize,
}

impl Metric {
    fn new(def: MetricDef) -> Self {
        Self {
            def,
            series: DashMap::new(),
            series_len: AtomicUsize::new(0),
        }
    }

    fn new_series(&self) -> Series {
        match self.def.kind() {
            MetricKind::Counter => Series::Counter(CounterSeries::default()),
            MetricKind::Histogram => Series::Histogram(HistogramSeries::new(self.def.buckets().len())),
        }
    }

    /// Run `f` against the series for `key`, creating it if absent.
    fn with_series<T>(
        &self,
        key: LabelValues,
        limit: usize,
        f: impl FnOnce(&Series) -> Result<T>,
    ) -> Result<T> {
        if let Some(series) = self.series.get(&key) {
            return f(series.value());
        }

        match self.series.entry(key) {
            Entry::Occupied(e) => f(e.get()),
            Entry::Vacant(e) => {
                // Reserve a slot before inserting; the shard lock is held, so
                // two racers on the same key cannot both get here.
                let reserved = self
                    .series_len
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (limit == 0 || n < limit).then_some(n + 1)
                    });
                if reserved.is_err() {
                    return Err(MetricsError::CardinalityExceeded {
                        metric: self.def.name().to_string(),
                        limit,
                    });
                }
                let series = e.insert(self.new_series());
                f(series.value())
            }
        }
    }

    /// Order caller-supplied `(name, value)` pairs by the label schema.
    fn resolve_labels(&self, labels: &[(&str, &str)]) -> Result<LabelValues> {
        let names = self.def.label_names();
        if labels.len() != names.len() {
            return Err(MetricsError::InvalidObservation(format!(
                "{}: expected {} labels, got {}",
                self.def.name(),
                names.len(),
                labels.len()
            )));
        }

        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let mut found = labels.iter().filter(|(k, _)| k == name);
            match (found.next(), found.next()) {
                (Some((_, v)), None) => values.push(v.to_string()),
                (None, _) => {
                    return Err(MetricsError::InvalidObservation(format!(
                        "{}: missing label {name}",
                        self.def.name()
                    )))
                }
                (Some(_), Some(_)) => {
                    return Err(MetricsError::InvalidObservation(format!(
                        "{}: label {name} given more than once",
                        self.def.name()
                    )))
                }
            }
        }
        Ok(values.into_boxed_slice())
    }
}

/// Owned collection of metric definitions and their series.
///
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct Registry {
    metrics: DashMap<String, Arc<Metric>>,
    opts: RegistryOptions,
    process: Option<ProcessCollector>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(opts: RegistryOptions) -> Self {
        let process = opts.process_metrics.then(ProcessCollector::new);
        Self {
            metrics: DashMap::new(),
            opts,
            process,
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.opts
    }

    /// Add a metric definition. Names are unique until [`Registry::clear`].
    ///
    /// With process metrics enabled, the collector's names count as taken.
    pub fn register(&self, def: MetricDef) -> Result<()> {
        def.validate()?;
        if self.process.is_some() && PROCESS_METRIC_NAMES.contains(&def.name()) {
            return Err(MetricsError::DuplicateMetric(def.name().to_string()));
        }
        match self.metrics.entry(def.name().to_string()) {
            Entry::Occupied(e) => Err(MetricsError::DuplicateMetric(e.key().clone())),
            Entry::Vacant(e) => {
                tracing::debug!(metric = %def.name(), kind = def.kind().as_str(), "metric registered");
                e.insert(Arc::new(Metric::new(def)));
                Ok(())
            }
        }
    }

    /// Drop every definition and series. Idempotent.
    pub fn clear(&self) {
        self.metrics.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    fn metric(&self, name: &str) -> Result<Arc<Metric>> {
        self.metrics
            .get(name)
            .map(|m| Arc::clone(m.value()))
            .ok_or_else(|| MetricsError::UnknownMetric(name.to_string()))
    }

    /// Increment by 1.
    pub fn inc(&self, name: &str, labels: &[(&str, &str)]) -> Result<()> {
        self.increment_counter(name, labels, 1)
    }

    /// Add `delta` to the counter series for `labels`.
    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)], delta: u64) -> Result<()> {
        let metric = self.metric(name)?;
        if metric.def.kind() != MetricKind::Counter {
            return Err(MetricsError::InvalidObservation(format!("{name} is not a counter")));
        }
        let key = metric.resolve_labels(labels)?;
        metric.with_series(key, self.opts.max_series_per_metric, |series| match series {
            Series::Counter(c) => c.add(delta),
            Series::Histogram(_) => Err(MetricsError::InvalidObservation(format!(
                "{name} is not a counter"
            ))),
        })
    }

    /// Record one observation (seconds) in the histogram series for `labels`.
    pub fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(MetricsError::InvalidObservation(format!(
                "{name}: observation must be finite and non-negative, got {value}"
            )));
        }
        let metric = self.metric(name)?;
        if metric.def.kind() != MetricKind::Histogram {
            return Err(MetricsError::InvalidObservation(format!("{name} is not a histogram")));
        }
        let key = metric.resolve_labels(labels)?;
        let bounds = metric.def.buckets();
        metric.with_series(key, self.opts.max_series_per_metric, |series| match series {
            Series::Histogram(h) => h.observe(bounds, value),
            Series::Counter(_) => Err(MetricsError::InvalidObservation(format!(
                "{name} is not a histogram"
            ))),
        })
    }

    /// Current value of one counter series, if it exists.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let metric = self.metric(name).ok()?;
        let key = metric.resolve_labels(labels).ok()?;
        let series = metric.series.get(&key)?;
        match series.value() {
            Series::Counter(c) => Some(c.get()),
            Series::Histogram(_) => None,
        }
    }

    /// Copy of one histogram series, if it exists.
    pub fn histogram_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramSnapshot> {
        let metric = self.metric(name).ok()?;
        let key = metric.resolve_labels(labels).ok()?;
        let series = metric.series.get(&key)?;
        match series.value() {
            Series::Histogram(h) => h.snapshot().ok(),
            Series::Counter(_) => None,
        }
    }

    /// Number of distinct label vectors recorded under `name`.
    pub fn series_count(&self, name: &str) -> usize {
        self.metric(name).map(|m| m.series.len()).unwrap_or(0)
    }

    /// Render every metric in the text exposition format.
    ///
    /// Process metrics come first, then registered metrics ordered by name,
    /// each with its series ordered by label values.
    pub fn snapshot(&self) -> Result<String> {
        let mut metrics: Vec<Arc<Metric>> =
            self.metrics.iter().map(|m| Arc::clone(m.value())).collect();
        metrics.sort_by(|a, b| a.def.name().cmp(b.def.name()));

        let mut out = String::new();
        if let Some(process) = &self.process {
            render::render_samples(&process.collect(), &mut out);
        }

        for metric in &metrics {
            let mut rows = Vec::with_capacity(metric.series.len());
            for r in metric.series.iter() {
                let value = match r.value() {
                    Series::Counter(c) => render::SeriesValue::Counter(c.get()),
                    Series::Histogram(h) => render::SeriesValue::Histogram(h.snapshot()?),
                };
                rows.push((r.key().clone(), value));
            }
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            render::render_metric(&metric.def, &rows, &mut out);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_histogram_fails_snapshot() {
        let reg = Registry::new();
        reg.register(MetricDef::histogram("lat", "latency", &[], &[1.0])).unwrap();
        reg.observe_histogram("lat", &[], 0.2).unwrap();

        let metric = reg.metric("lat").unwrap();
        for r in metric.series.iter() {
            if let Series::Histogram(h) = r.value() {
                h.poison();
            }
        }

        let err = reg.snapshot().unwrap_err();
        assert_eq!(err.code().as_str(), "SNAPSHOT_RENDER");
    }

    #[test]
    fn labels_resolve_in_schema_order() {
        let reg = Registry::new();
        reg.register(MetricDef::counter("c", "c", &["method", "route"])).unwrap();
        reg.inc("c", &[("route", "/a"), ("method", "GET")]).unwrap();
        reg.inc("c", &[("method", "GET"), ("route", "/a")]).unwrap();
        assert_eq!(reg.series_count("c"), 1);
        assert_eq!(reg.counter_value("c", &[("method", "GET"), ("route", "/a")]), Some(2));
    }
}
