// =====================================================================================
// File: core-resolution/src/lib.rs
// Description: Entity resolution for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Resolution Module
//!
//! The block/compare/merge pipeline that turns raw source records into
//! master entities (golden records): candidate blocking on entity kind,
//! weighted pairwise scoring with identifier short-circuit, declarative
//! auto-merge rules, reviewable match candidates, and reversible merge and
//! split operations with an auditable history.

pub mod compare;
pub mod error;
pub mod jobs;
pub mod rules;
pub mod service;
pub mod types;

// Re-export main types and traits
pub use compare::{compare_record_to_entity, FieldScores};
pub use error::{ResolutionError, ResolutionResult};
pub use jobs::{ResolutionJob, ResolutionJobStatus};
pub use rules::ResolutionRule;
pub use service::{completeness, EntityResolver, ResolverConfig};
pub use types::{
    AddressKind, AddressRecord, CandidateStatus, EntityKind, IdentifierKind, IdentifierRecord,
    MasterEntity, MatchCandidate, MatchConfidence, MergeHistoryEntry, MergeOperation, MergeType,
    NameKind, NameVariant, RelationshipRecord, ResolutionStatistics, ResolutionStatus,
    SourceRecord, SplitOperation,
};
