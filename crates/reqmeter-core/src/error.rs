//! Registry error type and the stable error codes shared across reqmeter crates.

use thiserror::Error;

/// Stable error codes (used in logs and JSON error bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A metric with the same name is already registered.
    DuplicateMetric,
    /// No metric is registered under the given name.
    UnknownMetric,
    /// Malformed metric definition (names, buckets).
    InvalidDefinition,
    /// Malformed increment/observe call.
    InvalidObservation,
    /// Per-metric series ceiling reached.
    CardinalityExceeded,
    /// Snapshot could not be rendered.
    SnapshotRender,
    /// Invalid input (configuration, requests).
    BadRequest,
    /// Internal failure outside the registry.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::UnknownMetric => "UNKNOWN_METRIC",
            ErrorCode::InvalidDefinition => "INVALID_DEFINITION",
            ErrorCode::InvalidObservation => "INVALID_OBSERVATION",
            ErrorCode::CardinalityExceeded => "CARDINALITY_EXCEEDED",
            ErrorCode::SnapshotRender => "SNAPSHOT_RENDER",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type for registry operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("invalid metric definition: {0}")]
    InvalidDefinition(String),
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
    #[error("series limit {limit} reached for metric {metric}")]
    CardinalityExceeded { metric: String, limit: usize },
    #[error("snapshot render failed: {0}")]
    SnapshotRender(String),
}

impl MetricsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::DuplicateMetric(_) => ErrorCode::DuplicateMetric,
            MetricsError::UnknownMetric(_) => ErrorCode::UnknownMetric,
            MetricsError::InvalidDefinition(_) => ErrorCode::InvalidDefinition,
            MetricsError::InvalidObservation(_) => ErrorCode::InvalidObservation,
            MetricsError::CardinalityExceeded { .. } => ErrorCode::CardinalityExceeded,
            MetricsError::SnapshotRender(_) => ErrorCode::SnapshotRender,
        }
    }
}
