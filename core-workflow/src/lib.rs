// =====================================================================================
// File: core-workflow/src/lib.rs
// Description: Workflow orchestration for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Workflow Module
//!
//! Templated multi-step workflows attached to alerts, cases, SARs, and
//! customer reviews: ordered steps with required flags, skip semantics, a
//! pending-approvers set that auto-completes the current step when it
//! drains, and terminal reject/cancel outcomes.

pub mod error;
pub mod service;
pub mod templates;
pub mod types;

// Re-export main types and traits
pub use error::{WorkflowError, WorkflowResult};
pub use service::WorkflowService;
pub use templates::steps_for;
pub use types::{
    StepApproval, StepStatus, Workflow, WorkflowCancellation, WorkflowReassignment,
    WorkflowRejection, WorkflowStatistics, WorkflowStatus, WorkflowStep, WorkflowType,
};
