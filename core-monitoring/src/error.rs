// =====================================================================================
// File: core-monitoring/src/error.rs
// Description: Error types for transaction monitoring
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for monitoring operations
pub type MonitoringResult<T> = Result<T, MonitoringError>;

/// Error types for monitoring operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MonitoringError {
    /// Target entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Precondition violated; never retried
    #[error("invalid request: {message}")]
    Invalid { message: String },

    /// Rule or analyzer configuration is invalid
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl MonitoringError {
    pub fn not_found<S: Into<String>>(entity: S, id: S) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            MonitoringError::NotFound { .. } => "not_found",
            MonitoringError::Invalid { .. } => "invalid",
            MonitoringError::Configuration { .. } => "configuration",
        }
    }
}
