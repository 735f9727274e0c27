//! reqmeter core: the metric registry, its error surface and the process
//! collector.
//!
//! This crate carries no HTTP or runtime dependencies. The gateway crate
//! owns one [`Registry`] per process and feeds it from request middleware.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied outside tests. Every
//! failing observation surfaces as a [`MetricsError`] so the host process
//! keeps serving when instrumentation goes wrong.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod error;
pub mod process;
pub mod registry;

pub use error::{ErrorCode, MetricsError, Result};
pub use registry::{
    HistogramSnapshot, MetricDef, MetricKind, Registry, RegistryOptions, TEXT_CONTENT_TYPE,
};
