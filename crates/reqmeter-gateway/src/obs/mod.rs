//! Observability plumbing: subscriber setup and route log events.

pub mod logging;

pub use logging::RouteLog;
