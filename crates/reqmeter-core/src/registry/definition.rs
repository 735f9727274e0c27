//! Metric definitions: name, kind, help text, label schema and buckets.

use crate::error::{MetricsError, Result};

/// Default latency buckets (seconds) for HTTP request durations.
pub const DEFAULT_DURATION_BUCKETS: [f64; 6] = [0.1, 0.5, 1.0, 2.5, 5.0, 10.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
}

impl MetricKind {
    /// Name used in the `# TYPE` exposition line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Immutable description of one metric.
///
/// Label names are ordered; every series of the metric stores its values in
/// exactly this order. Histogram bounds never change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDef {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
    buckets: Vec<f64>,
}

impl MetricDef {
    pub fn counter(name: impl Into<String>, help: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Counter,
            label_names: labels.iter().map(|l| l.to_string()).collect(),
            buckets: Vec::new(),
        }
    }

    pub fn histogram(
        name: impl Into<String>,
        help: impl Into<String>,
        labels: &[&str],
        buckets: &[f64],
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: MetricKind::Histogram,
            label_names: labels.iter().map(|l| l.to_string()).collect(),
            buckets: buckets.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Histogram upper bounds (empty for counters). `+Inf` is implicit.
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    /// Check names and buckets before the definition enters a registry.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_metric_name(&self.name) {
            return Err(MetricsError::InvalidDefinition(format!(
                "invalid metric name: {:?}",
                self.name
            )));
        }

        for (i, label) in self.label_names.iter().enumerate() {
            if !is_valid_label_name(label) {
                return Err(MetricsError::InvalidDefinition(format!(
                    "{}: invalid label name: {:?}",
                    self.name, label
                )));
            }
            if self.label_names[..i].contains(label) {
                return Err(MetricsError::InvalidDefinition(format!(
                    "{}: duplicate label name: {label}",
                    self.name
                )));
            }
        }

        match self.kind {
            MetricKind::Counter => {
                if !self.buckets.is_empty() {
                    return Err(MetricsError::InvalidDefinition(format!(
                        "{}: counters take no buckets",
                        self.name
                    )));
                }
            }
            MetricKind::Histogram => {
                if self.label_names.iter().any(|l| l == "le") {
                    return Err(MetricsError::InvalidDefinition(format!(
                        "{}: \"le\" is reserved for histogram buckets",
                        self.name
                    )));
                }
                if self.buckets.is_empty() {
                    return Err(MetricsError::InvalidDefinition(format!(
                        "{}: histogram needs at least one bucket",
                        self.name
                    )));
                }
                if self.buckets.iter().any(|b| !b.is_finite()) {
                    return Err(MetricsError::InvalidDefinition(format!(
                        "{}: bucket bounds must be finite (+Inf is implicit)",
                        self.name
                    )));
                }
                if self.buckets.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(MetricsError::InvalidDefinition(format!(
                        "{}: bucket bounds must be strictly increasing",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, and not starting with `__` (reserved).
fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
