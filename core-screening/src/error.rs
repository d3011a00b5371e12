// =====================================================================================
// File: core-screening/src/error.rs
// Description: Error types for the screening engine
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for screening operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ScreeningError {
    /// Target entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Precondition violated; never retried
    #[error("invalid request: {message}")]
    Invalid { message: String },

    /// Concurrent modification of per-entity state
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Screening configuration is invalid
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl ScreeningError {
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

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            ScreeningError::NotFound { .. } => "not_found",
            ScreeningError::Invalid { .. } => "invalid",
            ScreeningError::Conflict { .. } => "conflict",
            ScreeningError::Configuration { .. } => "configuration",
        }
    }
}
