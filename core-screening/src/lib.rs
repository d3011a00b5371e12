// =====================================================================================
// File: core-screening/src/lib.rs
// Description: Sanctions and watchlist screening for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Screening Module
//!
//! Fuzzy matching primitives, the sanctions screening engine, internal
//! watchlist management, and batch screening jobs. Screening itself is pure
//! in-memory computation over copy-on-write list snapshots; only batch jobs
//! touch the shared worker pool.

pub mod batch;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod types;
pub mod watchlist;

// Re-export main types and traits
pub use engine::{SanctionsCatalog, ScreeningConfig, ScreeningEngine};
pub use error::ScreeningError;
pub use matcher::{address_similarity, identifier_match, name_similarity, AddressFields, IdentifierFields};
pub use types::{
    BatchJobStatus, BatchScreeningJob, EntityIdentifier, MatchDetail, MatchStatus, NameMatchType,
    SanctionListEntry, SanctionListType, ScreenedEntityType, ScreeningRequest, ScreeningResult,
    ScreeningStatistics,
};
pub use watchlist::{
    Watchlist, WatchlistAuditEntry, WatchlistCategory, WatchlistEntry, WatchlistMatch,
    WatchlistRiskLevel, WatchlistService, WatchlistStatistics, WatchlistType,
};
