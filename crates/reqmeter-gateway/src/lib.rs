//! reqmeter gateway library entry.
//!
//! Wires the request instrumentation middleware, the metrics exporter and
//! the demo routes into an axum router around one shared registry. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod router;
pub mod routes;
