// =====================================================================================
// File: core-lifecycle/src/lib.rs
// Description: Alert, case, and SAR lifecycle for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Lifecycle Module
//!
//! The shared investigation lifecycle: alerts with severity-driven SLAs,
//! cases aggregating alerts with an append-only timeline, and SARs with a
//! multi-role approval chain and filing workflow. Public numbers are
//! allocated from strictly monotonic per-day sequences.

pub mod alert;
pub mod case;
pub mod error;
pub mod numbering;
pub mod sar;

// Re-export main types and traits
pub use alert::{
    Alert, AlertAssignment, AlertComment, AlertEvidence, AlertPage, AlertSearchCriteria,
    AlertService, AlertSeverity, AlertSortField, AlertStatistics, AlertStatus, AlertSummary,
    AlertType, CreateAlert, SortOrder, UpdateAlert,
};
pub use case::{
    Case, CaseAssignment, CaseCategory, CaseDocument, CasePage, CasePriority, CaseResolution,
    CaseSearchCriteria, CaseService, CaseStatistics, CaseStatus, CaseSummary, CaseTimelineEntry,
    CreateCase, InvestigationFinding, RelatedEntity,
};
pub use error::{LifecycleError, LifecycleResult};
pub use numbering::DailySequence;
pub use sar::{
    ApprovalDecision, CreateSar, Narrative, NarrativeSection, Sar, SarApproval, SarConfig,
    SarService, SarStatistics, SarStatus, SarSubmission, SarTransaction, SarType, SubjectInfo,
    SuspiciousActivity, SuspiciousActivityType,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_numbering_prefixes_are_distinct() {
        let alerts = AlertService::new();
        let cases = CaseService::new();
        let sars = SarService::default();

        let alert = alerts
            .create_alert(CreateAlert::new(
                AlertType::ManualReview,
                AlertSeverity::Low,
                "manual check",
                "C1",
            ))
            .await
            .unwrap();
        let case = cases
            .create_case(
                CreateCase::new(
                    "review",
                    CaseCategory::Other,
                    CasePriority::Low,
                    "C1",
                    "Jane Roe",
                ),
                "supervisor",
            )
            .await
            .unwrap();
        let sar = sars
            .create_sar(CreateSar::initial(SuspiciousActivityType::Other), "a1")
            .await
            .unwrap();

        assert!(alert.alert_number.starts_with("ALT-"));
        assert!(case.case_number.starts_with("CASE-"));
        assert!(sar.sar_number.starts_with("SAR-"));
    }
}
