// =====================================================================================
// File: core-workflow/src/error.rs
// Description: Error types for workflow orchestration
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Error types for workflow operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowError {
    /// Target workflow or step does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Precondition violated, including skipping required steps
    #[error("invalid operation: {message}")]
    Invalid { message: String },
}

impl WorkflowError {
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

    pub fn category(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::Invalid { .. } => "invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::invalid("cannot skip required step");
        assert!(err.to_string().contains("cannot skip required step"));
        assert_eq!(err.category(), "invalid");
    }
}
