// =====================================================================================
// File: core-workflow/src/templates.rs
// Description: Step templates for each workflow type
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use crate::types::{StepStatus, WorkflowStep, WorkflowType};

struct StepSpec {
    step_id: &'static str,
    step_name: &'static str,
    step_type: &'static str,
    required: bool,
}

const fn step(step_id: &'static str, step_name: &'static str, step_type: &'static str) -> StepSpec {
    StepSpec {
        step_id,
        step_name,
        step_type,
        required: true,
    }
}

const fn optional(
    step_id: &'static str,
    step_name: &'static str,
    step_type: &'static str,
) -> StepSpec {
    StepSpec {
        step_id,
        step_name,
        step_type,
        required: false,
    }
}

/// Materialize the ordered steps for a workflow type
pub fn steps_for(workflow_type: WorkflowType) -> Vec<WorkflowStep> {
    let specs: &[StepSpec] = match workflow_type {
        WorkflowType::AlertInvestigation => &[
            step("review_alert", "Review Alert Details", "review"),
            step("gather_info", "Gather Additional Information", "investigation"),
            step("analyze_transactions", "Analyze Transactions", "analysis"),
            step("document_findings", "Document Findings", "documentation"),
            step("make_decision", "Make Decision", "decision"),
            step("supervisor_review", "Supervisor Review", "approval"),
        ],
        WorkflowType::CaseInvestigation => &[
            step("case_setup", "Case Setup & Planning", "setup"),
            step("data_collection", "Data Collection", "collection"),
            step("analysis", "Deep Analysis", "analysis"),
            optional("network_analysis", "Network Analysis", "analysis"),
            step("document_findings", "Document Findings", "documentation"),
            step("risk_assessment", "Risk Assessment", "assessment"),
            step("recommendation", "Prepare Recommendation", "decision"),
            step("qc_review", "QC Review", "review"),
            step("manager_approval", "Manager Approval", "approval"),
        ],
        WorkflowType::SarPreparation => &[
            step("gather_info", "Gather Case Information", "collection"),
            step("identify_subjects", "Identify Subjects", "identification"),
            step("prepare_narrative", "Prepare Narrative", "documentation"),
            step("compile_transactions", "Compile Transactions", "compilation"),
            step("qc_review", "QC Review", "review"),
            step("compliance_approval", "Compliance Officer Approval", "approval"),
            step("bsa_officer_approval", "BSA Officer Approval", "approval"),
            step("file_sar", "File SAR", "filing"),
        ],
        WorkflowType::KycRefresh => &[
            step("request_documents", "Request Updated Documents", "request"),
            step("verify_documents", "Verify Documents", "verification"),
            step("update_profile", "Update Customer Profile", "update"),
            step("run_checks", "Run KYC Checks", "screening"),
            step("risk_assessment", "Update Risk Assessment", "assessment"),
            step("approval", "Approval", "approval"),
        ],
        WorkflowType::EddReview => &[
            step("identify_requirements", "Identify EDD Requirements", "identification"),
            step("collect_information", "Collect Additional Information", "collection"),
            step("source_of_funds", "Verify Source of Funds", "verification"),
            step("source_of_wealth", "Verify Source of Wealth", "verification"),
            step("adverse_media", "Adverse Media Review", "review"),
            step("risk_assessment", "Enhanced Risk Assessment", "assessment"),
            step("recommendation", "Prepare Recommendation", "decision"),
            step("committee_review", "Risk Committee Review", "approval"),
        ],
        WorkflowType::PeriodicReview => &[
            step("gather_data", "Gather Review Data", "collection"),
            step("activity_review", "Review Account Activity", "review"),
            step("risk_review", "Review Risk Assessment", "assessment"),
            step("kyc_validation", "Validate KYC Information", "validation"),
            optional("update_profile", "Update Profile if Needed", "update"),
            step("approval", "Review Approval", "approval"),
        ],
        WorkflowType::SanctionsRemediation => &[
            step("confirm_match", "Confirm Sanctions Match", "confirmation"),
            step("freeze_accounts", "Freeze Related Accounts", "action"),
            step("notify_compliance", "Notify Compliance", "notification"),
            step("document_exposure", "Document Sanctions Exposure", "documentation"),
            step("regulatory_report", "Prepare Regulatory Report", "reporting"),
            step("legal_review", "Legal Review", "review"),
            step("management_approval", "Senior Management Approval", "approval"),
            step("file_report", "File Regulatory Report", "filing"),
        ],
    };

    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| WorkflowStep {
            step_id: spec.step_id.to_string(),
            step_name: spec.step_name.to_string(),
            step_type: spec.step_type.to_string(),
            required: spec.required,
            order: index as u32 + 1,
            status: StepStatus::Pending,
            completed_at: None,
            completed_by: None,
            result: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_has_steps() {
        for workflow_type in [
            WorkflowType::AlertInvestigation,
            WorkflowType::CaseInvestigation,
            WorkflowType::SarPreparation,
            WorkflowType::KycRefresh,
            WorkflowType::EddReview,
            WorkflowType::PeriodicReview,
            WorkflowType::SanctionsRemediation,
        ] {
            let steps = steps_for(workflow_type);
            assert!(!steps.is_empty(), "{workflow_type:?} template is empty");
            // Orders are 1..N in sequence.
            for (i, step) in steps.iter().enumerate() {
                assert_eq!(step.order, i as u32 + 1);
                assert_eq!(step.status, StepStatus::Pending);
            }
            // Every investigation ends with an approval or filing step.
            let last = steps.last().unwrap();
            assert!(matches!(last.step_type.as_str(), "approval" | "filing"));
        }
    }

    #[test]
    fn test_case_investigation_network_analysis_is_optional() {
        let steps = steps_for(WorkflowType::CaseInvestigation);
        let network = steps.iter().find(|s| s.step_id == "network_analysis").unwrap();
        assert!(!network.required);
    }

    #[test]
    fn test_sar_preparation_has_two_approval_steps() {
        let steps = steps_for(WorkflowType::SarPreparation);
        let approvals = steps.iter().filter(|s| s.step_type == "approval").count();
        assert_eq!(approvals, 2);
    }
}
