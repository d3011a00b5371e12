// =====================================================================================
// File: core-screening/src/engine.rs
// Description: Sanctions screening engine
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use core_reference::SnapshotStore;

use crate::{
    error::ScreeningError,
    matcher,
    types::{
        BatchScreeningJob, MatchDetail, MatchStatus, NameMatchType, SanctionListEntry,
        SanctionListType, ScreenedEntityType, ScreeningRequest, ScreeningResult,
        ScreeningStatistics,
    },
};

/// Screening engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Default minimum overall score for retained matches
    pub default_match_threshold: f64,
    /// Candidates below this overall score are discarded outright
    pub min_candidate_score: f64,
    /// Name score at or above which a match is classified exact
    pub exact_name_threshold: f64,
    /// Name score at or above which a match is classified fuzzy
    pub fuzzy_name_threshold: f64,
    /// Overall score at or above which the subject must be flagged
    pub auto_flag_threshold: f64,
    /// Weight of the name component
    pub name_weight: f64,
    /// Weight of the identifier component
    pub identifier_weight: f64,
    /// Bonus for an exact date-of-birth match
    pub dob_bonus: f64,
    /// Bonus for a nationality overlap
    pub nationality_bonus: f64,
    /// Concurrent workers for batch jobs
    pub batch_concurrency: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            default_match_threshold: 0.8,
            min_candidate_score: 0.5,
            exact_name_threshold: 0.95,
            fuzzy_name_threshold: 0.7,
            auto_flag_threshold: 0.95,
            name_weight: 0.6,
            identifier_weight: 0.3,
            dob_bonus: 0.05,
            nationality_bonus: 0.05,
            batch_concurrency: 4,
        }
    }
}

impl ScreeningConfig {
    /// Validate threshold ranges and worker count
    pub fn validate(&self) -> Result<(), ScreeningError> {
        let unit_range = [
            ("default_match_threshold", self.default_match_threshold),
            ("min_candidate_score", self.min_candidate_score),
            ("exact_name_threshold", self.exact_name_threshold),
            ("fuzzy_name_threshold", self.fuzzy_name_threshold),
            ("auto_flag_threshold", self.auto_flag_threshold),
            ("name_weight", self.name_weight),
            ("identifier_weight", self.identifier_weight),
            ("dob_bonus", self.dob_bonus),
            ("nationality_bonus", self.nationality_bonus),
        ];
        for (field, value) in unit_range {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScreeningError::configuration(format!(
                    "{field} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.batch_concurrency == 0 {
            return Err(ScreeningError::configuration(
                "batch_concurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Immutable snapshot of the loaded sanctions lists
#[derive(Debug, Clone, Default)]
pub struct SanctionsCatalog {
    entries: HashMap<Uuid, SanctionListEntry>,
}

impl SanctionsCatalog {
    pub fn entries(&self) -> impl Iterator<Item = &SanctionListEntry> {
        self.entries.values()
    }

    pub fn get(&self, entry_id: &Uuid) -> Option<&SanctionListEntry> {
        self.entries.get(entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sanctions screening engine.
///
/// List data is held behind a copy-on-write snapshot so screening passes
/// never observe a half-applied list update.
pub struct ScreeningEngine {
    config: ScreeningConfig,
    catalog: SnapshotStore<SanctionsCatalog>,
    results: RwLock<HashMap<Uuid, ScreeningResult>>,
    pub(crate) jobs: RwLock<HashMap<Uuid, BatchScreeningJob>>,
    pub(crate) cancel_flags: RwLock<HashMap<Uuid, Arc<AtomicBool>>>,
}

impl ScreeningEngine {
    /// Create a new engine with an empty catalog
    pub fn new(config: ScreeningConfig) -> Result<Self, ScreeningError> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: SnapshotStore::default(),
            results: RwLock::new(HashMap::new()),
            jobs: RwLock::new(HashMap::new()),
            cancel_flags: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// Replace the loaded lists with a fresh snapshot
    pub fn load_entries(&self, entries: Vec<SanctionListEntry>) {
        let count = entries.len();
        let mut catalog = SanctionsCatalog::default();
        for entry in entries {
            catalog.entries.insert(entry.entry_id, entry);
        }
        self.catalog.publish(catalog);
        info!(entries = count, "sanctions catalog reloaded");
    }

    /// Add a single list entry, publishing a new snapshot
    pub fn add_entry(&self, entry: SanctionListEntry) {
        self.catalog.update(|catalog| {
            catalog.entries.insert(entry.entry_id, entry.clone());
        });
    }

    /// Deactivate a list entry so it no longer participates in screening
    pub fn deactivate_entry(&self, entry_id: Uuid) -> Result<(), ScreeningError> {
        if self.catalog.load().get(&entry_id).is_none() {
            return Err(ScreeningError::not_found(
                "sanction list entry".to_string(),
                entry_id.to_string(),
            ));
        }
        self.catalog.update(|catalog| {
            if let Some(entry) = catalog.entries.get_mut(&entry_id) {
                entry.is_active = false;
                entry.last_updated = Utc::now();
            }
        });
        Ok(())
    }

    /// List entries, optionally filtered by list type
    pub fn entries(&self, list_type: Option<SanctionListType>) -> Vec<SanctionListEntry> {
        self.catalog
            .load()
            .entries()
            .filter(|e| list_type.map(|lt| e.list_type == lt).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Screen one entity against the requested lists.
    ///
    /// Evaluation runs entirely against the in-memory snapshot; no I/O
    /// happens on this path.
    pub async fn screen(
        &self,
        request: ScreeningRequest,
    ) -> Result<ScreeningResult, ScreeningError> {
        if !(0.0..=1.0).contains(&request.match_threshold) {
            return Err(ScreeningError::invalid(format!(
                "match_threshold must be within [0, 1], got {}",
                request.match_threshold
            )));
        }
        if request.entity_name.trim().is_empty() {
            return Err(ScreeningError::invalid("entity_name must not be empty"));
        }

        let lists: Vec<SanctionListType> = if request.lists_to_screen.is_empty() {
            SanctionListType::all()
        } else {
            request.lists_to_screen.clone()
        };

        let catalog = self.catalog.load();
        let mut matches: Vec<MatchDetail> = catalog
            .entries()
            .filter(|entry| entry.is_active && lists.contains(&entry.list_type))
            .filter_map(|entry| self.score_entry(&request, entry))
            .filter(|m| m.match_score >= request.match_threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.list_entry_id.cmp(&b.list_entry_id))
        });

        let highest = matches.first().map(|m| m.match_score).unwrap_or(0.0);
        let result = ScreeningResult {
            result_id: Uuid::new_v4(),
            request_id: request.request_id,
            entity_type: request.entity_type,
            entity_id: request.entity_id.clone(),
            entity_name: request.entity_name.clone(),
            has_matches: !matches.is_empty(),
            match_count: matches.len(),
            highest_match_score: highest,
            matches,
            lists_screened: lists,
            screening_date: Utc::now(),
            status: MatchStatus::PendingReview,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        };

        debug!(
            entity = %result.entity_name,
            matches = result.match_count,
            highest = result.highest_match_score,
            "screening completed"
        );

        self.results
            .write()
            .await
            .insert(result.result_id, result.clone());
        Ok(result)
    }

    /// Score one candidate entry against the request.
    ///
    /// Overall = name_weight * name + identifier_weight * identifier +
    /// bonuses, clipped to [0, 1]. When neither side carries identifiers the
    /// identifier weight folds into the name component so a clean name match
    /// is not penalised for data that was never available.
    fn score_entry(
        &self,
        request: &ScreeningRequest,
        entry: &SanctionListEntry,
    ) -> Option<MatchDetail> {
        let name_score = request
            .all_names()
            .flat_map(|req_name| {
                entry
                    .all_names()
                    .map(move |entry_name| matcher::name_similarity(req_name, entry_name))
            })
            .fold(0.0_f64, f64::max);

        let identifier_comparable =
            !request.identifiers.is_empty() && !entry.identifiers.is_empty();
        let identifier_score = if identifier_comparable {
            let matched = request.identifiers.iter().any(|req_id| {
                entry
                    .identifiers
                    .iter()
                    .any(|entry_id| matcher::identifier_match(&req_id.as_fields(), &entry_id.as_fields()))
            });
            if matched {
                1.0
            } else {
                0.0
            }
        } else {
            0.0
        };

        let dob_match = matches_dob(request.date_of_birth, entry.date_of_birth);
        let nationality_match = request
            .nationalities
            .iter()
            .any(|n| entry.nationalities.iter().any(|e| e == n));

        let mut overall = if identifier_comparable {
            self.config.name_weight * name_score
                + self.config.identifier_weight * identifier_score
        } else {
            (self.config.name_weight + self.config.identifier_weight) * name_score
        };
        if dob_match {
            overall += self.config.dob_bonus;
        }
        if nationality_match {
            overall += self.config.nationality_bonus;
        }
        let overall = overall.clamp(0.0, 1.0);

        if overall < self.config.min_candidate_score {
            return None;
        }

        let name_match_type = if name_score >= self.config.exact_name_threshold {
            NameMatchType::Exact
        } else if name_score >= self.config.fuzzy_name_threshold {
            NameMatchType::Fuzzy
        } else {
            NameMatchType::Partial
        };

        Some(MatchDetail {
            match_id: Uuid::new_v4(),
            list_entry_id: entry.entry_id,
            list_type: entry.list_type,
            match_score: overall,
            name_match_score: name_score,
            identifier_match_score: identifier_score,
            name_match_type,
            dob_match,
            nationality_match,
            matched_name: entry.primary_name.clone(),
            matched_aliases: entry.aliases.clone(),
            sanction_programs: entry.sanction_programs.clone(),
        })
    }

    /// Fetch a stored screening result
    pub async fn get_result(&self, result_id: Uuid) -> Option<ScreeningResult> {
        self.results.read().await.get(&result_id).cloned()
    }

    /// Record the human review decision on a screening result
    pub async fn review_result(
        &self,
        result_id: Uuid,
        decision: MatchStatus,
        reviewed_by: &str,
        notes: Option<String>,
    ) -> Result<ScreeningResult, ScreeningError> {
        let mut results = self.results.write().await;
        let result = results.get_mut(&result_id).ok_or_else(|| {
            ScreeningError::not_found("screening result".to_string(), result_id.to_string())
        })?;
        if decision == MatchStatus::PendingReview {
            return Err(ScreeningError::invalid(
                "review decision cannot be pending_review",
            ));
        }
        result.status = decision;
        result.reviewed_by = Some(reviewed_by.to_string());
        result.reviewed_at = Some(Utc::now());
        result.review_notes = notes;
        Ok(result.clone())
    }

    /// Aggregate statistics over the loaded lists and stored results
    pub async fn statistics(&self) -> ScreeningStatistics {
        let catalog = self.catalog.load();
        let mut stats = ScreeningStatistics {
            total_entries: catalog.len(),
            ..Default::default()
        };
        for entry in catalog.entries() {
            if entry.is_active {
                stats.active_entries += 1;
            }
            *stats
                .by_list_type
                .entry(entry.list_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        let results = self.results.read().await;
        stats.total_screenings = results.len();
        stats.total_matches = results.values().map(|r| r.match_count).sum();
        stats.batch_jobs = self.jobs.read().await.len();
        stats
    }

    /// Built-in bootstrap entries used until a real list import runs
    pub fn builtin_entries() -> Vec<SanctionListEntry> {
        let mut ofac = SanctionListEntry::new(
            SanctionListType::OfacSdn,
            "OFAC SDN List",
            ScreenedEntityType::Individual,
            "John Smith Doe",
        );
        ofac.aliases = vec![
            "John Doe".to_string(),
            "J. Smith".to_string(),
            "Johnny Doe".to_string(),
        ];
        ofac.nationalities = vec!["US".to_string(), "MX".to_string()];
        ofac.date_of_birth = NaiveDate::from_ymd_opt(1975, 3, 14);
        ofac.sanction_programs = vec!["SDGT".to_string(), "SDNTK".to_string()];
        ofac.sanction_reasons = vec![
            "Terrorism".to_string(),
            "Narcotics Trafficking".to_string(),
        ];

        let mut un = SanctionListEntry::new(
            SanctionListType::UnConsolidated,
            "UN Consolidated List",
            ScreenedEntityType::Organization,
            "Evil Corp Ltd",
        );
        un.aliases = vec!["Evil Corporation".to_string(), "EC Holdings".to_string()];
        un.sanction_programs = vec!["UN-1267".to_string()];
        un.sanction_reasons = vec!["Terrorism Support".to_string()];

        let mut eu = SanctionListEntry::new(
            SanctionListType::EuConsolidated,
            "EU Consolidated List",
            ScreenedEntityType::Individual,
            "Ivan Petrov",
        );
        eu.aliases = vec!["I. Petrov".to_string(), "Vanya Petrov".to_string()];
        eu.nationalities = vec!["RU".to_string()];
        eu.sanction_programs = vec!["EU-269/2014".to_string()];

        vec![ofac, un, eu]
    }
}

fn matches_dob(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityIdentifier;

    fn engine_with_builtin() -> ScreeningEngine {
        let engine = ScreeningEngine::new(ScreeningConfig::default()).unwrap();
        engine.load_entries(ScreeningEngine::builtin_entries());
        engine
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScreeningConfig::default();
        assert!(config.validate().is_ok());

        config.default_match_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = ScreeningConfig::default();
        config.batch_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_exact_name_with_dob_is_exact_match() {
        let engine = engine_with_builtin();
        let mut request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Smith Doe", "analyst1");
        request.date_of_birth = NaiveDate::from_ymd_opt(1975, 3, 14);
        request.nationalities = vec!["US".to_string()];

        let result = engine.screen(request).await.unwrap();
        assert!(result.has_matches);
        assert_eq!(result.highest_match_score, 1.0);

        let top = &result.matches[0];
        assert_eq!(top.name_match_type, NameMatchType::Exact);
        assert!(top.dob_match);
        assert!(top.nationality_match);
        assert_eq!(result.status, MatchStatus::PendingReview);
        assert!(result.requires_sanctions_flag(engine.config().auto_flag_threshold));
    }

    #[tokio::test]
    async fn test_unrelated_name_has_no_matches() {
        let engine = engine_with_builtin();
        let request = ScreeningRequest::new(
            ScreenedEntityType::Individual,
            "Completely Unrelated Person",
            "analyst1",
        );
        let result = engine.screen(request).await.unwrap();
        assert!(!result.has_matches);
        assert_eq!(result.highest_match_score, 0.0);
    }

    #[tokio::test]
    async fn test_identifier_match_drives_score() {
        let engine = ScreeningEngine::new(ScreeningConfig::default()).unwrap();
        let mut entry = SanctionListEntry::new(
            SanctionListType::OfacConsolidated,
            "OFAC Consolidated",
            ScreenedEntityType::Individual,
            "Maria Gonzalez",
        );
        entry
            .identifiers
            .push(EntityIdentifier::new("passport", "X99001", Some("PA")));
        engine.load_entries(vec![entry]);

        let mut request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "Maria Gonzalez", "analyst1");
        request
            .identifiers
            .push(EntityIdentifier::new("passport", "x99001", Some("PA")));

        let result = engine.screen(request).await.unwrap();
        assert!(result.has_matches);
        // 0.6 * 1.0 name + 0.3 * 1.0 identifier
        assert!((result.highest_match_score - 0.9).abs() < 1e-9);
        assert_eq!(result.matches[0].identifier_match_score, 1.0);
    }

    #[tokio::test]
    async fn test_candidates_below_threshold_are_dropped() {
        let engine = engine_with_builtin();
        let mut request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Miller", "analyst1");
        request.match_threshold = 0.8;
        let result = engine.screen(request).await.unwrap();
        // Shares one token with the OFAC entry; nowhere near 0.8 overall.
        assert!(!result.has_matches);
    }

    #[tokio::test]
    async fn test_matches_sorted_by_score_then_entry_id() {
        let engine = ScreeningEngine::new(ScreeningConfig::default()).unwrap();
        let a = SanctionListEntry::new(
            SanctionListType::OfacSdn,
            "OFAC SDN List",
            ScreenedEntityType::Individual,
            "Omar Haddad",
        );
        let b = SanctionListEntry::new(
            SanctionListType::UnConsolidated,
            "UN Consolidated List",
            ScreenedEntityType::Individual,
            "Omar Haddad",
        );
        let (low_id, high_id) = if a.entry_id < b.entry_id {
            (a.entry_id, b.entry_id)
        } else {
            (b.entry_id, a.entry_id)
        };
        engine.load_entries(vec![a, b]);

        let request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "Omar Haddad", "analyst1");
        let result = engine.screen(request).await.unwrap();
        assert_eq!(result.match_count, 2);
        assert_eq!(result.matches[0].list_entry_id, low_id);
        assert_eq!(result.matches[1].list_entry_id, high_id);
    }

    #[tokio::test]
    async fn test_inactive_entries_are_skipped() {
        let engine = engine_with_builtin();
        let entry_id = engine.entries(Some(SanctionListType::OfacSdn))[0].entry_id;
        engine.deactivate_entry(entry_id).unwrap();

        let request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Smith Doe", "analyst1");
        let result = engine.screen(request).await.unwrap();
        assert!(!result.has_matches);
    }

    #[tokio::test]
    async fn test_invalid_threshold_rejected() {
        let engine = engine_with_builtin();
        let mut request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Smith Doe", "analyst1");
        request.match_threshold = 1.2;
        let err = engine.screen(request).await.unwrap_err();
        assert_eq!(err.category(), "invalid");
    }

    #[tokio::test]
    async fn test_review_result_updates_status() {
        let engine = engine_with_builtin();
        let request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Smith Doe", "analyst1");
        let result = engine.screen(request).await.unwrap();

        let reviewed = engine
            .review_result(
                result.result_id,
                MatchStatus::FalsePositive,
                "reviewer1",
                Some("common name".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, MatchStatus::FalsePositive);
        assert_eq!(reviewed.reviewed_by.as_deref(), Some("reviewer1"));
    }

    #[tokio::test]
    async fn test_statistics_counts() {
        let engine = engine_with_builtin();
        let request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Smith Doe", "analyst1");
        engine.screen(request).await.unwrap();

        let stats = engine.statistics().await;
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.active_entries, 3);
        assert_eq!(stats.total_screenings, 1);
        assert!(stats.total_matches >= 1);
    }

    #[tokio::test]
    async fn test_snapshot_update_does_not_disturb_reader() {
        let engine = engine_with_builtin();
        let before = engine.entries(None).len();
        engine.add_entry(SanctionListEntry::new(
            SanctionListType::UkHmt,
            "UK HMT",
            ScreenedEntityType::Individual,
            "New Person",
        ));
        assert_eq!(engine.entries(None).len(), before + 1);
    }
}
