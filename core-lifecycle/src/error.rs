// =====================================================================================
// File: core-lifecycle/src/error.rs
// Description: Error types for the investigation lifecycle
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Error types for lifecycle operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LifecycleError {
    /// Target alert, case, or SAR does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Precondition violated, including illegal state transitions
    #[error("invalid operation: {message}")]
    Invalid { message: String },

    /// Optimistic-lock failure on per-entity state
    #[error("conflict: {message}")]
    Conflict { message: String },
}

impl LifecycleError {
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

    pub fn category(&self) -> &'static str {
        match self {
            LifecycleError::NotFound { .. } => "not_found",
            LifecycleError::Invalid { .. } => "invalid",
            LifecycleError::Conflict { .. } => "conflict",
        }
    }

    /// Illegal state-transition helper
    pub fn transition<S: std::fmt::Debug>(from: S, to: S) -> Self {
        Self::Invalid {
            message: format!("illegal transition from {from:?} to {to:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LifecycleError::not_found("alert", "ALT-20260801-000001");
        assert_eq!(err.to_string(), "alert not found: ALT-20260801-000001");
    }

    #[test]
    fn test_transition_helper() {
        let err = LifecycleError::transition("New", "SarFiled");
        assert!(err.to_string().contains("illegal transition"));
        assert_eq!(err.category(), "invalid");
    }
}
