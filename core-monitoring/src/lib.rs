// =====================================================================================
// File: core-monitoring/src/lib.rs
// Description: Transaction monitoring for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Monitoring Module
//!
//! The realtime rule engine, the versioned rule registry, and the batch
//! pattern detectors (structuring, layering, round-tripping, rapid
//! movement, velocity, geography). Realtime evaluation is synchronous and
//! stateless; all sliding counters arrive in the caller-built customer
//! context, and every emitted pattern pins the rule version that produced
//! it.

pub mod analyzer;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod flow;
pub mod rules;
pub mod types;

// Re-export main types and traits
pub use analyzer::BatchAnalyzer;
pub use detectors::{DetectorConfig, PatternDetector};
pub use engine::{EvaluationOutcome, RuleEngine};
pub use error::{MonitoringError, MonitoringResult};
pub use flow::{build_transaction_flow, FlowEdge, FlowNode, TransactionFlow};
pub use rules::{MonitoringRule, RuleRegistry, RuleSet};
pub use types::{
    AnalysisRequest, AnalysisResult, AnalysisStatus, CustomerBatch, CustomerContext,
    DetectedPattern, PatternDetails, PatternSeverity, PatternStatus, PatternType, RecentCredit,
    StructuringIndicator, Transaction, TransactionChannel, TransactionDirection, VelocityBaseline,
};
