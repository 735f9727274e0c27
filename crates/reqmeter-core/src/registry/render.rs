//! Prometheus text exposition rendering.

use std::fmt::Write;

use super::definition::MetricDef;
use super::series::HistogramSnapshot;
use crate::process::ProcessSample;

pub(super) enum SeriesValue {
    Counter(u64),
    Histogram(HistogramSnapshot),
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// `name="value",...` for one series, without braces.
fn label_pairs(names: &[String], values: &[String]) -> String {
    names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn braced(pairs: &str) -> String {
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{pairs}}}")
    }
}

fn header(name: &str, help: &str, kind: &str, out: &mut String) {
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

pub(super) fn render_metric(def: &MetricDef, rows: &[(Box<[String]>, SeriesValue)], out: &mut String) {
    let name = def.name();
    header(name, def.help(), def.kind().as_str(), out);

    for (values, value) in rows {
        let pairs = label_pairs(def.label_names(), values);
        match value {
            SeriesValue::Counter(v) => {
                let _ = writeln!(out, "{}{} {}", name, braced(&pairs), v);
            }
            SeriesValue::Histogram(h) => {
                let prefix = if pairs.is_empty() { String::new() } else { format!("{pairs},") };
                for (le, count) in def.buckets().iter().zip(&h.buckets) {
                    let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
                }
                let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, h.count);
                let _ = writeln!(out, "{}_sum{} {}", name, braced(&pairs), h.sum);
                let _ = writeln!(out, "{}_count{} {}", name, braced(&pairs), h.count);
            }
        }
    }
}

pub(super) fn render_samples(samples: &[ProcessSample], out: &mut String) {
    for s in samples {
        header(s.name, s.help, s.kind.as_str(), out);
        let _ = writeln!(out, "{} {}", s.name, s.value);
    }
}
