// =====================================================================================
// File: core-risk/src/lib.rs
// Description: Customer risk scoring for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Risk Module
//!
//! Customer risk aggregation across the six weighted categories
//! (geography, product, channel, customer, transaction, industry),
//! behaviour profiles, assessment history, review scheduling, and the
//! administrative override workflow.

pub mod error;
pub mod scoring;
pub mod service;
pub mod types;

// Re-export main types and traits
pub use error::{RiskError, RiskResult};
pub use scoring::RiskCatalogs;
pub use service::{RiskConfig, RiskScoringService};
pub use types::{
    AssessmentTrigger, BehaviorProfile, CategoryWeights, CustomerRiskAssessment,
    CustomerRiskLevel, CustomerRiskProfile, CustomerType, OverrideApproval, OverrideStatus,
    PepStatus, RiskFactor, RiskFactorCategory, RiskOverrideRequest,
};

#[cfg(test)]
mod tests {
    use super::*;
    use core_reference::{CountryRiskTable, SnapshotStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_service_construction_with_shared_table() {
        let countries = Arc::new(SnapshotStore::new(CountryRiskTable::default()));
        let service = RiskScoringService::new(RiskConfig::default(), countries).unwrap();
        assert_eq!(service.config().weights.geography, 0.25);
    }
}
