//! Per-label-vector series state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{MetricsError, Result};

/// Label values ordered by the owning definition's schema.
pub type LabelValues = Box<[String]>;

#[derive(Debug, Default)]
pub struct CounterSeries {
    value: AtomicU64,
}

impl CounterSeries {
    /// Add `delta`, refusing to wrap around.
    pub fn add(&self, delta: u64) -> Result<()> {
        self.value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_add(delta))
            .map(|_| ())
            .map_err(|v| {
                MetricsError::InvalidObservation(format!("counter overflow: {v} + {delta}"))
            })
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Point-in-time copy of one histogram series.
///
/// `buckets[i]` is the cumulative count of observations `<= bounds[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub buckets: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

/// Histogram state behind a single lock so buckets, sum and count always
/// move together and a snapshot never sees them out of step.
#[derive(Debug)]
pub struct HistogramSeries {
    state: Mutex<HistogramSnapshot>,
}

impl HistogramSeries {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            state: Mutex::new(HistogramSnapshot {
                buckets: vec![0; bucket_count],
                sum: 0.0,
                count: 0,
            }),
        }
    }

    /// Record `value` against `bounds` (the definition's bucket bounds).
    /// The caller has already checked that `value` is finite and non-negative.
    pub fn observe(&self, bounds: &[f64], value: f64) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MetricsError::InvalidObservation("histogram series lock poisoned".into()))?;

        // Cumulative buckets: every bound >= value takes the observation.
        for (slot, &le) in state.buckets.iter_mut().zip(bounds) {
            if value <= le {
                *slot += 1;
            }
        }
        state.count += 1;
        state.sum += value;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<HistogramSnapshot> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| MetricsError::SnapshotRender("histogram series lock poisoned".into()))
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.state.lock();
            panic!("poison histogram series");
        }));
    }
}

#[derive(Debug)]
pub enum Series {
    Counter(CounterSeries),
    Histogram(HistogramSeries),
}
