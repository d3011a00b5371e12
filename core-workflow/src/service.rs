// =====================================================================================
// File: core-workflow/src/service.rs
// Description: Workflow orchestration service
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{WorkflowError, WorkflowResult},
    templates,
    types::{
        StepApproval, StepStatus, Workflow, WorkflowCancellation, WorkflowReassignment,
        WorkflowRejection, WorkflowStatistics, WorkflowStatus, WorkflowType,
    },
};

/// Orchestrates templated multi-step workflows.
///
/// Human-in-the-loop transitions are plain commands on stored state; the
/// service never waits on an approver.
pub struct WorkflowService {
    workflows: RwLock<HashMap<Uuid, Workflow>>,
}

impl WorkflowService {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Instantiate a workflow from its template
    pub async fn create_workflow(
        &self,
        workflow_type: WorkflowType,
        entity_id: &str,
        entity_type: &str,
        created_by: &str,
        due_date: Option<DateTime<Utc>>,
        assigned_to: Option<String>,
    ) -> WorkflowResult<Workflow> {
        if entity_id.trim().is_empty() {
            return Err(WorkflowError::invalid("entity_id must not be empty"));
        }

        let now = Utc::now();
        let workflow = Workflow {
            workflow_id: Uuid::new_v4(),
            workflow_type,
            entity_id: entity_id.to_string(),
            entity_type: entity_type.to_string(),
            status: WorkflowStatus::Pending,
            steps: templates::steps_for(workflow_type),
            current_step_index: 0,
            pending_approvers: Vec::new(),
            approvals: Vec::new(),
            rejection: None,
            cancellation: None,
            reassignment_history: Vec::new(),
            assigned_to,
            due_date: Some(due_date.unwrap_or(now + Duration::days(30))),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.workflows
            .write()
            .await
            .insert(workflow.workflow_id, workflow.clone());
        info!(
            workflow = %workflow.workflow_id,
            kind = workflow.workflow_type.as_str(),
            entity = %entity_id,
            "workflow created"
        );
        Ok(workflow)
    }

    pub async fn get_workflow(&self, workflow_id: Uuid) -> Option<Workflow> {
        self.workflows.read().await.get(&workflow_id).cloned()
    }

    /// Begin executing: the first step moves into progress
    pub async fn start_workflow(&self, workflow_id: Uuid) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status != WorkflowStatus::Pending {
            return Err(WorkflowError::invalid("workflow has already started"));
        }
        workflow.status = WorkflowStatus::InProgress;
        if let Some(step) = workflow.steps.first_mut() {
            step.status = StepStatus::InProgress;
        }
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    /// Complete a step and advance the current index
    pub async fn complete_step(
        &self,
        workflow_id: Uuid,
        step_id: &str,
        completed_by: &str,
        result: Option<serde_json::Value>,
    ) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status != WorkflowStatus::InProgress {
            return Err(WorkflowError::invalid(format!(
                "workflow is {} and cannot progress",
                workflow.status.as_str()
            )));
        }

        Self::finish_step(workflow, step_id, completed_by, result, StepStatus::Completed)?;
        debug!(workflow = %workflow_id, step = step_id, "step completed");
        Ok(workflow.clone())
    }

    /// Skip an optional step; required steps cannot be skipped
    pub async fn skip_step(
        &self,
        workflow_id: Uuid,
        step_id: &str,
        skipped_by: &str,
        reason: &str,
    ) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status != WorkflowStatus::InProgress {
            return Err(WorkflowError::invalid(format!(
                "workflow is {} and cannot progress",
                workflow.status.as_str()
            )));
        }

        let step = workflow
            .steps
            .iter()
            .find(|s| s.step_id == step_id)
            .ok_or_else(|| {
                WorkflowError::not_found("workflow step".to_string(), step_id.to_string())
            })?;
        if step.required {
            return Err(WorkflowError::invalid("cannot skip required step"));
        }

        let result = serde_json::json!({"skipped_by": skipped_by, "reason": reason});
        Self::finish_step(workflow, step_id, skipped_by, Some(result), StepStatus::Skipped)?;
        Ok(workflow.clone())
    }

    /// Park the workflow until the named approvers have all signed off
    pub async fn request_approval(
        &self,
        workflow_id: Uuid,
        requested_by: &str,
        approvers: Vec<String>,
    ) -> WorkflowResult<Workflow> {
        if approvers.is_empty() {
            return Err(WorkflowError::invalid("approvers must not be empty"));
        }
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status != WorkflowStatus::InProgress {
            return Err(WorkflowError::invalid(
                "approval can only be requested while in progress",
            ));
        }
        workflow.status = WorkflowStatus::AwaitingApproval;
        workflow.pending_approvers = approvers;
        workflow.updated_at = Utc::now();
        debug!(workflow = %workflow_id, requested_by, "approval requested");
        Ok(workflow.clone())
    }

    /// Record one approval; the last one auto-completes the current step
    pub async fn approve_step(
        &self,
        workflow_id: Uuid,
        approver: &str,
        comments: Option<String>,
    ) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status != WorkflowStatus::AwaitingApproval {
            return Err(WorkflowError::invalid("workflow is not awaiting approval"));
        }
        let position = workflow
            .pending_approvers
            .iter()
            .position(|a| a == approver)
            .ok_or_else(|| {
                WorkflowError::invalid(format!("{approver} is not a pending approver"))
            })?;

        workflow.pending_approvers.remove(position);
        workflow.approvals.push(StepApproval {
            approver: approver.to_string(),
            approved_at: Utc::now(),
            comments,
        });

        if workflow.pending_approvers.is_empty() {
            workflow.status = WorkflowStatus::InProgress;
            let step_id = workflow
                .current_step()
                .map(|s| s.step_id.clone())
                .ok_or_else(|| WorkflowError::invalid("workflow has no current step"))?;
            Self::finish_step(workflow, &step_id, approver, None, StepStatus::Completed)?;
        }
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    /// Reject the workflow; terminal
    pub async fn reject_step(
        &self,
        workflow_id: Uuid,
        rejected_by: &str,
        reason: &str,
    ) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status.is_terminal() {
            return Err(WorkflowError::invalid("workflow is already terminal"));
        }
        workflow.status = WorkflowStatus::Rejected;
        workflow.rejection = Some(WorkflowRejection {
            rejected_by: rejected_by.to_string(),
            rejected_at: Utc::now(),
            reason: reason.to_string(),
        });
        workflow.updated_at = Utc::now();
        info!(workflow = %workflow_id, rejected_by, "workflow rejected");
        Ok(workflow.clone())
    }

    /// Cancel the workflow; terminal
    pub async fn cancel_workflow(
        &self,
        workflow_id: Uuid,
        cancelled_by: &str,
        reason: &str,
    ) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        if workflow.status.is_terminal() {
            return Err(WorkflowError::invalid("workflow is already terminal"));
        }
        workflow.status = WorkflowStatus::Cancelled;
        workflow.cancellation = Some(WorkflowCancellation {
            cancelled_by: cancelled_by.to_string(),
            cancelled_at: Utc::now(),
            reason: reason.to_string(),
        });
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    /// Hand the workflow to a different owner
    pub async fn reassign_workflow(
        &self,
        workflow_id: Uuid,
        new_assignee: &str,
        reassigned_by: &str,
    ) -> WorkflowResult<Workflow> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows.get_mut(&workflow_id).ok_or_else(|| {
            WorkflowError::not_found("workflow".to_string(), workflow_id.to_string())
        })?;
        workflow.reassignment_history.push(WorkflowReassignment {
            from: workflow.assigned_to.clone(),
            to: new_assignee.to_string(),
            by: reassigned_by.to_string(),
            at: Utc::now(),
        });
        workflow.assigned_to = Some(new_assignee.to_string());
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    pub async fn workflows_for_entity(&self, entity_id: &str, entity_type: &str) -> Vec<Workflow> {
        self.workflows
            .read()
            .await
            .values()
            .filter(|w| w.entity_id == entity_id && w.entity_type == entity_type)
            .cloned()
            .collect()
    }

    pub async fn assigned_workflows(&self, assignee: &str) -> Vec<Workflow> {
        self.workflows
            .read()
            .await
            .values()
            .filter(|w| {
                w.assigned_to.as_deref() == Some(assignee)
                    && !matches!(
                        w.status,
                        WorkflowStatus::Completed | WorkflowStatus::Cancelled
                    )
            })
            .cloned()
            .collect()
    }

    /// Past due and neither completed nor cancelled
    pub async fn overdue_workflows(&self) -> Vec<Workflow> {
        let now = Utc::now();
        self.workflows
            .read()
            .await
            .values()
            .filter(|w| w.is_overdue(now))
            .cloned()
            .collect()
    }

    pub async fn get_statistics(&self) -> WorkflowStatistics {
        let now = Utc::now();
        let workflows = self.workflows.read().await;
        let mut stats = WorkflowStatistics {
            total: workflows.len(),
            ..Default::default()
        };
        for workflow in workflows.values() {
            *stats
                .by_status
                .entry(workflow.status.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_type
                .entry(workflow.workflow_type.as_str().to_string())
                .or_insert(0) += 1;
            if workflow.is_overdue(now) {
                stats.overdue += 1;
            }
            if workflow.status == WorkflowStatus::AwaitingApproval {
                stats.awaiting_approval += 1;
            }
        }
        stats
    }

    fn finish_step(
        workflow: &mut Workflow,
        step_id: &str,
        actor: &str,
        result: Option<serde_json::Value>,
        final_status: StepStatus,
    ) -> WorkflowResult<()> {
        let index = workflow
            .steps
            .iter()
            .position(|s| s.step_id == step_id)
            .ok_or_else(|| {
                WorkflowError::not_found("workflow step".to_string(), step_id.to_string())
            })?;
        {
            let step = &mut workflow.steps[index];
            if matches!(step.status, StepStatus::Completed | StepStatus::Skipped) {
                return Err(WorkflowError::invalid(format!(
                    "step {step_id} is already finished"
                )));
            }
            step.status = final_status;
            step.completed_at = Some(Utc::now());
            step.completed_by = Some(actor.to_string());
            step.result = result;
        }

        if index + 1 < workflow.steps.len() {
            workflow.current_step_index = index + 1;
            workflow.steps[index + 1].status = StepStatus::InProgress;
        } else {
            workflow.status = WorkflowStatus::Completed;
            workflow.completed_at = Some(Utc::now());
        }
        workflow.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for WorkflowService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn started(service: &WorkflowService, workflow_type: WorkflowType) -> Workflow {
        let workflow = service
            .create_workflow(workflow_type, "ALT-1", "alert", "supervisor", None, None)
            .await
            .unwrap();
        service.start_workflow(workflow.workflow_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_start() {
        let service = WorkflowService::new();
        let workflow = started(&service, WorkflowType::AlertInvestigation).await;
        assert_eq!(workflow.status, WorkflowStatus::InProgress);
        assert_eq!(workflow.steps[0].status, StepStatus::InProgress);
        assert_eq!(workflow.current_step_index, 0);
    }

    #[tokio::test]
    async fn test_complete_steps_to_finish() {
        let service = WorkflowService::new();
        let workflow = started(&service, WorkflowType::KycRefresh).await;
        let step_ids: Vec<String> =
            workflow.steps.iter().map(|s| s.step_id.clone()).collect();

        let mut latest = workflow;
        for step_id in &step_ids {
            latest = service
                .complete_step(latest.workflow_id, step_id, "analyst1", None)
                .await
                .unwrap();
        }
        assert_eq!(latest.status, WorkflowStatus::Completed);
        assert!(latest.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_skip_required_step_fails() {
        let service = WorkflowService::new();
        let workflow = started(&service, WorkflowType::AlertInvestigation).await;

        let err = service
            .skip_step(workflow.workflow_id, "review_alert", "analyst1", "busy")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot skip required step"));
    }

    #[tokio::test]
    async fn test_skip_optional_step_advances() {
        let service = WorkflowService::new();
        let workflow = started(&service, WorkflowType::CaseInvestigation).await;

        for step_id in ["case_setup", "data_collection", "analysis"] {
            service
                .complete_step(workflow.workflow_id, step_id, "analyst1", None)
                .await
                .unwrap();
        }
        let skipped = service
            .skip_step(
                workflow.workflow_id,
                "network_analysis",
                "analyst1",
                "single-party case",
            )
            .await
            .unwrap();
        let step = skipped
            .steps
            .iter()
            .find(|s| s.step_id == "network_analysis")
            .unwrap();
        assert_eq!(step.status, StepStatus::Skipped);
        assert_eq!(
            skipped.current_step().unwrap().step_id,
            "document_findings"
        );
    }

    #[tokio::test]
    async fn test_approval_flow_auto_completes_step() {
        let service = WorkflowService::new();
        let workflow = started(&service, WorkflowType::PeriodicReview).await;

        let awaiting = service
            .request_approval(
                workflow.workflow_id,
                "analyst1",
                vec!["manager1".to_string(), "manager2".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(awaiting.status, WorkflowStatus::AwaitingApproval);

        let one = service
            .approve_step(workflow.workflow_id, "manager1", None)
            .await
            .unwrap();
        assert_eq!(one.status, WorkflowStatus::AwaitingApproval);
        assert_eq!(one.pending_approvers, vec!["manager2".to_string()]);

        let both = service
            .approve_step(workflow.workflow_id, "manager2", Some("looks good".to_string()))
            .await
            .unwrap();
        assert_eq!(both.status, WorkflowStatus::InProgress);
        assert_eq!(both.steps[0].status, StepStatus::Completed);
        assert_eq!(both.current_step_index, 1);
        assert_eq!(both.approvals.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_approver_rejected() {
        let service = WorkflowService::new();
        let workflow = started(&service, WorkflowType::PeriodicReview).await;
        service
            .request_approval(workflow.workflow_id, "analyst1", vec!["manager1".to_string()])
            .await
            .unwrap();

        let err = service
            .approve_step(workflow.workflow_id, "impostor", None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "invalid");
    }

    #[tokio::test]
    async fn test_reject_and_cancel_are_terminal() {
        let service = WorkflowService::new();
        let a = started(&service, WorkflowType::EddReview).await;
        let rejected = service
            .reject_step(a.workflow_id, "manager1", "insufficient evidence")
            .await
            .unwrap();
        assert_eq!(rejected.status, WorkflowStatus::Rejected);
        assert!(service
            .complete_step(a.workflow_id, "identify_requirements", "x", None)
            .await
            .is_err());

        let b = started(&service, WorkflowType::EddReview).await;
        let cancelled = service
            .cancel_workflow(b.workflow_id, "supervisor", "customer exited")
            .await
            .unwrap();
        assert_eq!(cancelled.status, WorkflowStatus::Cancelled);
        assert!(service
            .cancel_workflow(b.workflow_id, "supervisor", "again")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_reassignment_history() {
        let service = WorkflowService::new();
        let workflow = service
            .create_workflow(
                WorkflowType::SarPreparation,
                "SAR-1",
                "sar",
                "supervisor",
                None,
                Some("analyst1".to_string()),
            )
            .await
            .unwrap();

        let reassigned = service
            .reassign_workflow(workflow.workflow_id, "analyst2", "supervisor")
            .await
            .unwrap();
        assert_eq!(reassigned.assigned_to.as_deref(), Some("analyst2"));
        assert_eq!(reassigned.reassignment_history.len(), 1);
        assert_eq!(
            reassigned.reassignment_history[0].from.as_deref(),
            Some("analyst1")
        );

        assert_eq!(service.assigned_workflows("analyst2").await.len(), 1);
        assert!(service.assigned_workflows("analyst1").await.is_empty());
    }

    #[tokio::test]
    async fn test_overdue_detection() {
        let service = WorkflowService::new();
        let workflow = service
            .create_workflow(
                WorkflowType::AlertInvestigation,
                "ALT-9",
                "alert",
                "supervisor",
                Some(Utc::now() - Duration::days(1)),
                None,
            )
            .await
            .unwrap();
        service.start_workflow(workflow.workflow_id).await.unwrap();

        let overdue = service.overdue_workflows().await;
        assert_eq!(overdue.len(), 1);

        service
            .cancel_workflow(workflow.workflow_id, "supervisor", "stale")
            .await
            .unwrap();
        assert!(service.overdue_workflows().await.is_empty());
    }

    #[tokio::test]
    async fn test_statistics() {
        let service = WorkflowService::new();
        started(&service, WorkflowType::AlertInvestigation).await;
        let parked = started(&service, WorkflowType::EddReview).await;
        service
            .request_approval(parked.workflow_id, "analyst1", vec!["manager1".to_string()])
            .await
            .unwrap();

        let stats = service.get_statistics().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.awaiting_approval, 1);
        assert_eq!(stats.by_type.get("edd_review"), Some(&1));
    }
}
