// =====================================================================================
// File: service-aml/src/error.rs
// Description: Unified error surface for the composition root
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use thiserror::Error;

/// Result type alias for composed operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the composed core, wrapping each subsystem's errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Screening(#[from] core_screening::ScreeningError),

    #[error(transparent)]
    Resolution(#[from] core_resolution::ResolutionError),

    #[error(transparent)]
    Monitoring(#[from] core_monitoring::MonitoringError),

    #[error(transparent)]
    Risk(#[from] core_risk::RiskError),

    #[error(transparent)]
    Lifecycle(#[from] core_lifecycle::LifecycleError),

    #[error(transparent)]
    Workflow(#[from] core_workflow::WorkflowError),
}

impl ServiceError {
    /// The three caller-visible kinds plus configuration
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::Screening(err) => err.category(),
            ServiceError::Resolution(err) => err.category(),
            ServiceError::Monitoring(err) => err.category(),
            ServiceError::Risk(err) => err.category(),
            ServiceError::Lifecycle(err) => err.category(),
            ServiceError::Workflow(err) => err.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_passthrough() {
        let err: ServiceError =
            core_lifecycle::LifecycleError::invalid("SAR must be approved before filing").into();
        assert_eq!(err.category(), "invalid");
        assert!(err.to_string().contains("approved before filing"));
    }
}
