// =====================================================================================
// File: core-reference/src/lib.rs
// Description: Shared reference data for the ClearLedger AML core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # Core Reference Module
//!
//! Read-mostly reference data shared across the AML analytical core: the
//! country risk table and the copy-on-write snapshot store that screening
//! lists, watchlists, and monitoring rules are published through. Writers
//! publish a new immutable snapshot; readers pick it up on their next
//! operation and never hold a lock across an evaluation.

pub mod error;
pub mod geography;
pub mod store;

pub use error::{ReferenceError, ReferenceResult};
pub use geography::{CountryRisk, CountryRiskTable, RiskTier};
pub use store::SnapshotStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_store_and_country_table_compose() {
        let store = SnapshotStore::new(CountryRiskTable::default());
        let snapshot = store.load();
        assert!(snapshot.risk_score_or_default("KP") > snapshot.risk_score_or_default("DE"));
    }
}
