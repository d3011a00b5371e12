// =====================================================================================
// File: core-risk/src/error.rs
// Description: Error types for customer risk scoring
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for risk operations
pub type RiskResult<T> = Result<T, RiskError>;

/// Error types for risk operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RiskError {
    /// Target profile or override does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Precondition violated; never retried
    #[error("invalid request: {message}")]
    Invalid { message: String },

    /// Concurrent modification of per-customer state
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Scoring configuration is invalid
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl RiskError {
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
            RiskError::NotFound { .. } => "not_found",
            RiskError::Invalid { .. } => "invalid",
            RiskError::Conflict { .. } => "conflict",
            RiskError::Configuration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskError::not_found("risk profile", "C1");
        assert_eq!(err.to_string(), "risk profile not found: C1");
        assert_eq!(err.category(), "not_found");
    }
}
