// =====================================================================================
// File: core-workflow/src/types.rs
// Description: Workflow instance and step types
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow templates supported by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    AlertInvestigation,
    CaseInvestigation,
    SarPreparation,
    KycRefresh,
    EddReview,
    PeriodicReview,
    SanctionsRemediation,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::AlertInvestigation => "alert_investigation",
            WorkflowType::CaseInvestigation => "case_investigation",
            WorkflowType::SarPreparation => "sar_preparation",
            WorkflowType::KycRefresh => "kyc_refresh",
            WorkflowType::EddReview => "edd_review",
            WorkflowType::PeriodicReview => "periodic_review",
            WorkflowType::SanctionsRemediation => "sanctions_remediation",
        }
    }
}

/// Workflow instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    AwaitingApproval,
    Rejected,
    Completed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Cancelled | WorkflowStatus::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::AwaitingApproval => "awaiting_approval",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Cancelled => "cancelled",
        }
    }
}

/// Step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

/// One ordered step of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step_id: String,
    pub step_name: String,
    pub step_type: String,
    pub required: bool,
    pub order: u32,
    pub status: StepStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
    pub result: Option<serde_json::Value>,
}

/// Approval recorded against the current step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepApproval {
    pub approver: String,
    pub approved_at: DateTime<Utc>,
    pub comments: Option<String>,
}

/// Terminal rejection record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRejection {
    pub rejected_by: String,
    pub rejected_at: DateTime<Utc>,
    pub reason: String,
}

/// Terminal cancellation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowCancellation {
    pub cancelled_by: String,
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
}

/// One reassignment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReassignment {
    pub from: Option<String>,
    pub to: String,
    pub by: String,
    pub at: DateTime<Utc>,
}

/// A workflow instance bound to an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: Uuid,
    pub workflow_type: WorkflowType,
    pub entity_id: String,
    pub entity_type: String,
    pub status: WorkflowStatus,
    pub steps: Vec<WorkflowStep>,
    pub current_step_index: usize,
    pub pending_approvers: Vec<String>,
    pub approvals: Vec<StepApproval>,
    pub rejection: Option<WorkflowRejection>,
    pub cancellation: Option<WorkflowCancellation>,
    pub reassignment_history: Vec<WorkflowReassignment>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn current_step(&self) -> Option<&WorkflowStep> {
        self.steps.get(self.current_step_index)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !matches!(
            self.status,
            WorkflowStatus::Completed | WorkflowStatus::Cancelled
        ) && self.due_date.map(|d| d < now).unwrap_or(false)
    }
}

/// Aggregate workflow statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStatistics {
    pub total: usize,
    pub by_status: std::collections::HashMap<String, usize>,
    pub by_type: std::collections::HashMap<String, usize>,
    pub overdue: usize,
    pub awaiting_approval: usize,
}
