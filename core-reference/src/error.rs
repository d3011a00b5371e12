// =====================================================================================
// File: core-reference/src/error.rs
// Description: Error types for reference data
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for reference data operations
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Error types for reference data operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ReferenceError {
    /// Requested reference entry does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Reference data configuration is invalid
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl ReferenceError {
    pub fn not_found<S: Into<String>>(entity: S, id: S) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
