// =====================================================================================
// File: core-screening/src/types.rs
// Description: Core types for sanctions and watchlist screening
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sanctions and watch lists the engine can screen against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionListType {
    OfacSdn,
    OfacConsolidated,
    UnConsolidated,
    EuConsolidated,
    UkHmt,
    FatfHighRisk,
    PepList,
    InternalWatchlist,
}

impl SanctionListType {
    pub fn all() -> Vec<SanctionListType> {
        vec![
            SanctionListType::OfacSdn,
            SanctionListType::OfacConsolidated,
            SanctionListType::UnConsolidated,
            SanctionListType::EuConsolidated,
            SanctionListType::UkHmt,
            SanctionListType::FatfHighRisk,
            SanctionListType::PepList,
            SanctionListType::InternalWatchlist,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SanctionListType::OfacSdn => "ofac_sdn",
            SanctionListType::OfacConsolidated => "ofac_consolidated",
            SanctionListType::UnConsolidated => "un_consolidated",
            SanctionListType::EuConsolidated => "eu_consolidated",
            SanctionListType::UkHmt => "uk_hmt",
            SanctionListType::FatfHighRisk => "fatf_high_risk",
            SanctionListType::PepList => "pep_list",
            SanctionListType::InternalWatchlist => "internal_watchlist",
        }
    }
}

/// Kind of entity being screened or listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenedEntityType {
    Individual,
    Organization,
    Vessel,
    Aircraft,
}

/// Review status of a screening result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    PendingReview,
    ConfirmedMatch,
    FalsePositive,
    PotentialMatch,
    Escalated,
}

/// How closely the name matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatchType {
    Exact,
    Fuzzy,
    Partial,
}

/// Typed identifier attached to a screened entity or list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIdentifier {
    /// Identifier type: tax_id, passport, account_number, phone, email
    pub kind: String,
    pub value: String,
    pub issuing_country: Option<String>,
    pub is_verified: bool,
}

impl EntityIdentifier {
    pub fn new(kind: &str, value: &str, issuing_country: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
            issuing_country: issuing_country.map(|c| c.to_string()),
            is_verified: false,
        }
    }

    pub fn as_fields(&self) -> crate::matcher::IdentifierFields<'_> {
        crate::matcher::IdentifierFields {
            kind: &self.kind,
            value: &self.value,
            issuing_country: self.issuing_country.as_deref(),
        }
    }
}

/// Entry in a sanctions list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanctionListEntry {
    pub entry_id: Uuid,
    pub list_type: SanctionListType,
    pub list_name: String,
    pub entity_type: ScreenedEntityType,
    pub primary_name: String,
    pub aliases: Vec<String>,
    pub identifiers: Vec<EntityIdentifier>,
    pub nationalities: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    pub sanction_programs: Vec<String>,
    pub sanction_reasons: Vec<String>,
    pub listing_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    pub is_active: bool,
}

impl SanctionListEntry {
    pub fn new(
        list_type: SanctionListType,
        list_name: &str,
        entity_type: ScreenedEntityType,
        primary_name: &str,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            list_type,
            list_name: list_name.to_string(),
            entity_type,
            primary_name: primary_name.to_string(),
            aliases: Vec::new(),
            identifiers: Vec::new(),
            nationalities: Vec::new(),
            date_of_birth: None,
            place_of_birth: None,
            sanction_programs: Vec::new(),
            sanction_reasons: Vec::new(),
            listing_date: None,
            last_updated: Utc::now(),
            is_active: true,
        }
    }

    /// Primary name plus all aliases
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Request to screen one entity against one or more lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub request_id: Uuid,
    pub entity_type: ScreenedEntityType,
    pub entity_id: Option<String>,
    pub entity_name: String,
    pub aliases: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationalities: Vec<String>,
    pub identifiers: Vec<EntityIdentifier>,
    /// Lists to screen; empty means every list
    pub lists_to_screen: Vec<SanctionListType>,
    /// Minimum overall score for a match to be retained
    pub match_threshold: f64,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
}

impl ScreeningRequest {
    pub fn new(entity_type: ScreenedEntityType, entity_name: &str, requested_by: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            entity_type,
            entity_id: None,
            entity_name: entity_name.to_string(),
            aliases: Vec::new(),
            date_of_birth: None,
            nationalities: Vec::new(),
            identifiers: Vec::new(),
            lists_to_screen: Vec::new(),
            match_threshold: 0.8,
            requested_by: requested_by.to_string(),
            requested_at: Utc::now(),
        }
    }

    /// Requested name plus all aliases
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.entity_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// One retained match from a screening pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDetail {
    pub match_id: Uuid,
    pub list_entry_id: Uuid,
    pub list_type: SanctionListType,
    /// Overall score in [0, 1]
    pub match_score: f64,
    pub name_match_score: f64,
    pub identifier_match_score: f64,
    pub name_match_type: NameMatchType,
    pub dob_match: bool,
    pub nationality_match: bool,
    pub matched_name: String,
    pub matched_aliases: Vec<String>,
    pub sanction_programs: Vec<String>,
}

/// Result of screening one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub result_id: Uuid,
    pub request_id: Uuid,
    pub entity_type: ScreenedEntityType,
    pub entity_id: Option<String>,
    pub entity_name: String,
    pub has_matches: bool,
    pub match_count: usize,
    pub highest_match_score: f64,
    /// Matches sorted by (score desc, list_entry_id asc)
    pub matches: Vec<MatchDetail>,
    pub lists_screened: Vec<SanctionListType>,
    pub screening_date: DateTime<Utc>,
    pub status: MatchStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl ScreeningResult {
    /// Whether any match is strong enough to force the sanctions flag
    pub fn requires_sanctions_flag(&self, auto_flag_threshold: f64) -> bool {
        self.highest_match_score >= auto_flag_threshold
    }
}

/// Progress status of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Batch screening job with progress counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScreeningJob {
    pub job_id: Uuid,
    pub job_name: String,
    pub status: BatchJobStatus,
    pub total_entities: usize,
    pub entities_processed: usize,
    pub matches_found: usize,
    pub errors_count: usize,
    pub lists_to_screen: Vec<SanctionListType>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Screening statistics snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreeningStatistics {
    pub total_entries: usize,
    pub active_entries: usize,
    pub by_list_type: std::collections::HashMap<String, usize>,
    pub total_screenings: usize,
    pub total_matches: usize,
    pub batch_jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_all_names_includes_aliases() {
        let mut entry = SanctionListEntry::new(
            SanctionListType::OfacSdn,
            "OFAC SDN List",
            ScreenedEntityType::Individual,
            "John Smith Doe",
        );
        entry.aliases = vec!["J. Smith".to_string(), "Johnny Doe".to_string()];

        let names: Vec<&str> = entry.all_names().collect();
        assert_eq!(names, vec!["John Smith Doe", "J. Smith", "Johnny Doe"]);
    }

    #[test]
    fn test_request_defaults() {
        let request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "Jane Roe", "analyst1");
        assert_eq!(request.match_threshold, 0.8);
        assert!(request.lists_to_screen.is_empty());
        assert_eq!(request.all_names().count(), 1);
    }

    #[test]
    fn test_list_type_round_trip() {
        for list_type in SanctionListType::all() {
            let json = serde_json::to_string(&list_type).unwrap();
            let back: SanctionListType = serde_json::from_str(&json).unwrap();
            assert_eq!(list_type, back);
            assert_eq!(json.trim_matches('"'), list_type.as_str());
        }
    }

    #[test]
    fn test_requires_sanctions_flag() {
        let result = ScreeningResult {
            result_id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            entity_type: ScreenedEntityType::Individual,
            entity_id: None,
            entity_name: "X".to_string(),
            has_matches: true,
            match_count: 1,
            highest_match_score: 0.96,
            matches: Vec::new(),
            lists_screened: Vec::new(),
            screening_date: Utc::now(),
            status: MatchStatus::PendingReview,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        };
        assert!(result.requires_sanctions_flag(0.95));
        assert!(!result.requires_sanctions_flag(0.97));
    }
}
