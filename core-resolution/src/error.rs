// =====================================================================================
// File: core-resolution/src/error.rs
// Description: Error types for entity resolution
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for resolution operations
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Error types for resolution operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ResolutionError {
    /// Target record or entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Precondition violated; never retried
    #[error("invalid request: {message}")]
    Invalid { message: String },

    /// Concurrent modification of per-entity state
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Resolver configuration is invalid
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl ResolutionError {
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

    pub fn category(&self) -> &'static str {
        match self {
            ResolutionError::NotFound { .. } => "not_found",
            ResolutionError::Invalid { .. } => "invalid",
            ResolutionError::Conflict { .. } => "conflict",
            ResolutionError::Configuration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolutionError::not_found("source record", "CRM-001");
        assert_eq!(err.to_string(), "source record not found: CRM-001");
        assert_eq!(err.category(), "not_found");
    }
}
