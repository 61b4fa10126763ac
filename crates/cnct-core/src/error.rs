//! Error types for cnct

use std::time::Duration;
use thiserror::Error;

/// Boxed driver error, kept intact so callers can downcast to the driver's own type
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for cnct operations
#[derive(Error, Debug)]
pub enum CnctError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Timeout: {operation} did not complete within {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Driver error during {operation}: {source}")]
    Driver {
        operation: &'static str,
        #[source]
        source: DriverError,
    },
}

impl CnctError {
    /// Wrap a driver error raised while running `operation`
    pub fn driver(operation: &'static str, source: impl Into<DriverError>) -> Self {
        CnctError::Driver {
            operation,
            source: source.into(),
        }
    }

    /// True when a single-document lookup matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, CnctError::NotFound(_))
    }

    /// True when the call's deadline elapsed before the driver answered
    pub fn is_timeout(&self) -> bool {
        matches!(self, CnctError::Timeout { .. })
    }

    /// Name of the operation that failed, when the error carries one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            CnctError::Timeout { operation, .. } | CnctError::Driver { operation, .. } => {
                Some(operation)
            }
            _ => None,
        }
    }
}

/// Result type alias for cnct operations
pub type Result<T> = std::result::Result<T, CnctError>;
