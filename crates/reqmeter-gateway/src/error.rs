//! Gateway-level errors (startup and config).

use thiserror::Error;

use reqmeter_core::{ErrorCode, MetricsError};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::BadRequest(_) => ErrorCode::BadRequest,
            GatewayError::Io(_) => ErrorCode::Internal,
            GatewayError::Metrics(e) => e.code(),
        }
    }
}
