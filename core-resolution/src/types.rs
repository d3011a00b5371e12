// =====================================================================================
// File: core-resolution/src/types.rs
// Description: Core types for entity resolution and golden records
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of real-world party a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Individual,
    Organization,
    Account,
    Transaction,
}

/// Confidence label derived from a pairwise score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Definite,
    Probable,
    Possible,
    Unlikely,
}

impl MatchConfidence {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.95 {
            MatchConfidence::Definite
        } else if score >= 0.80 {
            MatchConfidence::Probable
        } else if score >= 0.60 {
            MatchConfidence::Possible
        } else {
            MatchConfidence::Unlikely
        }
    }
}

/// Resolution state of a source record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    AutoResolved,
    ManuallyResolved,
    Rejected,
    Split,
}

/// Name flavour on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKind {
    Legal,
    Alias,
    Maiden,
    Trading,
    Former,
}

/// One name variant carried by an entity or source record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameVariant {
    pub variant_id: Uuid,
    pub name_kind: NameKind,
    pub full_name: String,
    pub source_system: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub is_primary: bool,
}

impl NameVariant {
    pub fn legal(full_name: &str, source_system: &str) -> Self {
        Self {
            variant_id: Uuid::new_v4(),
            name_kind: NameKind::Legal,
            full_name: full_name.to_string(),
            source_system: source_system.to_string(),
            confidence: 1.0,
            is_primary: true,
        }
    }

    pub fn alias(full_name: &str, source_system: &str) -> Self {
        Self {
            variant_id: Uuid::new_v4(),
            name_kind: NameKind::Alias,
            full_name: full_name.to_string(),
            source_system: source_system.to_string(),
            confidence: 0.8,
            is_primary: false,
        }
    }
}

/// Address usage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Residential,
    Business,
    Mailing,
    Registered,
}

/// Address attached to an entity or source record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address_id: Uuid,
    pub address_kind: AddressKind,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_current: bool,
    pub source_system: String,
    pub confidence: f64,
}

impl AddressRecord {
    pub fn residential(line1: &str, city: &str, country: &str, source_system: &str) -> Self {
        Self {
            address_id: Uuid::new_v4(),
            address_kind: AddressKind::Residential,
            line1: line1.to_string(),
            line2: None,
            city: city.to_string(),
            state_province: None,
            postal_code: None,
            country: country.to_string(),
            valid_from: None,
            valid_to: None,
            is_current: true,
            source_system: source_system.to_string(),
            confidence: 1.0,
        }
    }

    pub fn as_fields(&self) -> core_screening::AddressFields<'_> {
        core_screening::AddressFields {
            country: Some(&self.country),
            city: Some(&self.city),
            postal_code: self.postal_code.as_deref(),
            street1: Some(&self.line1),
        }
    }
}

/// Identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    TaxId,
    Passport,
    AccountNumber,
    Phone,
    Email,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::TaxId => "tax_id",
            IdentifierKind::Passport => "passport",
            IdentifierKind::AccountNumber => "account_number",
            IdentifierKind::Phone => "phone",
            IdentifierKind::Email => "email",
        }
    }
}

/// Identifier attached to an entity or source record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierRecord {
    pub identifier_id: Uuid,
    pub kind: IdentifierKind,
    pub value: String,
    pub issuing_country: Option<String>,
    pub is_verified: bool,
    pub source_system: String,
    pub confidence: f64,
}

impl IdentifierRecord {
    pub fn new(kind: IdentifierKind, value: &str, source_system: &str) -> Self {
        Self {
            identifier_id: Uuid::new_v4(),
            kind,
            value: value.to_string(),
            issuing_country: None,
            is_verified: false,
            source_system: source_system.to_string(),
            confidence: 1.0,
        }
    }

    pub fn as_fields(&self) -> core_screening::IdentifierFields<'_> {
        core_screening::IdentifierFields {
            kind: self.kind.as_str(),
            value: &self.value,
            issuing_country: self.issuing_country.as_deref(),
        }
    }

    /// Uniqueness key within an entity: (type, value, issuing country)
    pub fn dedup_key(&self) -> (IdentifierKind, String, Option<String>) {
        (
            self.kind,
            self.value.to_lowercase(),
            self.issuing_country.clone(),
        )
    }
}

/// Typed relationship between two entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub relationship_id: Uuid,
    pub related_entity_id: Uuid,
    pub relationship_type: String,
    pub ownership_percentage: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub source_system: String,
}

/// Immutable merge-history entry on a master entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeHistoryEntry {
    pub merged_entity_id: Uuid,
    pub merged_at: DateTime<Utc>,
    pub merged_by: String,
    pub confidence: f64,
}

/// Master entity (golden record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterEntity {
    pub entity_id: Uuid,
    pub entity_kind: EntityKind,
    pub primary_name: String,
    pub name_variants: Vec<NameVariant>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationalities: Vec<String>,
    pub addresses: Vec<AddressRecord>,
    pub identifiers: Vec<IdentifierRecord>,
    pub relationships: Vec<RelationshipRecord>,
    pub source_record_ids: Vec<String>,
    pub source_systems: Vec<String>,
    /// Percentage of key fields populated
    pub completeness_score: f64,
    pub overall_quality_score: f64,
    pub is_pep: bool,
    pub is_sanctioned: bool,
    pub is_on_watchlist: bool,
    pub merge_history: Vec<MergeHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_resolved_at: Option<DateTime<Utc>>,
}

impl MasterEntity {
    /// The single primary name variant, when one is marked
    pub fn primary_variant(&self) -> Option<&NameVariant> {
        self.name_variants.iter().find(|v| v.is_primary)
    }

    /// All names for comparison purposes
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.name_variants.iter().map(|v| v.full_name.as_str())
    }
}

/// Raw record from an upstream system awaiting resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub record_id: String,
    pub source_system: String,
    pub entity_kind: EntityKind,
    pub names: Vec<NameVariant>,
    pub addresses: Vec<AddressRecord>,
    pub identifiers: Vec<IdentifierRecord>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationalities: Vec<String>,
    pub master_entity_id: Option<Uuid>,
    pub resolution_status: ResolutionStatus,
    pub resolution_confidence: f64,
    pub ingested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SourceRecord {
    pub fn new(record_id: &str, source_system: &str, entity_kind: EntityKind) -> Self {
        Self {
            record_id: record_id.to_string(),
            source_system: source_system.to_string(),
            entity_kind,
            names: Vec::new(),
            addresses: Vec::new(),
            identifiers: Vec::new(),
            date_of_birth: None,
            nationalities: Vec::new(),
            master_entity_id: None,
            resolution_status: ResolutionStatus::Pending,
            resolution_confidence: 0.0,
            ingested_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.full_name.as_str())
            .unwrap_or("Unknown")
    }
}

/// Review state of a match candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// Candidate pairing of a source record and a master entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub candidate_id: Uuid,
    pub record_id: String,
    pub record_source: String,
    pub entity_id: Uuid,
    pub overall_score: f64,
    pub confidence: MatchConfidence,
    pub name_score: f64,
    pub address_score: f64,
    pub identifier_score: f64,
    pub dob_score: f64,
    pub matching_fields: Vec<String>,
    pub non_matching_fields: Vec<String>,
    pub status: CandidateStatus,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub detected_at: DateTime<Utc>,
}

/// Kind of merge performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    Auto,
    Manual,
}

/// Audit record of a merge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOperation {
    pub merge_id: Uuid,
    pub merge_type: MergeType,
    pub surviving_entity_id: Uuid,
    pub merged_entity_ids: Vec<Uuid>,
    pub merge_confidence: f64,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

/// Audit record of a split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOperation {
    pub split_id: Uuid,
    pub original_entity_id: Uuid,
    pub new_entity_ids: Vec<Uuid>,
    pub split_reason: String,
    /// record_id -> new entity group name
    pub record_assignments: HashMap<String, String>,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

/// Resolution statistics snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionStatistics {
    pub total_master_entities: usize,
    pub total_source_records: usize,
    pub unresolved_records: usize,
    pub pending_review: usize,
    pub by_entity_kind: HashMap<String, usize>,
    pub by_source_system: HashMap<String, usize>,
    pub total_merges: usize,
    pub total_splits: usize,
    pub average_quality_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_labels() {
        assert_eq!(MatchConfidence::from_score(1.0), MatchConfidence::Definite);
        assert_eq!(MatchConfidence::from_score(0.95), MatchConfidence::Definite);
        assert_eq!(MatchConfidence::from_score(0.85), MatchConfidence::Probable);
        assert_eq!(MatchConfidence::from_score(0.65), MatchConfidence::Possible);
        assert_eq!(MatchConfidence::from_score(0.30), MatchConfidence::Unlikely);
    }

    #[test]
    fn test_identifier_dedup_key_case_insensitive() {
        let mut a = IdentifierRecord::new(IdentifierKind::Passport, "AB1234", "crm");
        a.issuing_country = Some("US".to_string());
        let mut b = IdentifierRecord::new(IdentifierKind::Passport, "ab1234", "kyc");
        b.issuing_country = Some("US".to_string());
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_source_record_display_name() {
        let mut record = SourceRecord::new("R1", "crm", EntityKind::Individual);
        assert_eq!(record.display_name(), "Unknown");
        record.names.push(NameVariant::legal("Jane Doe", "crm"));
        assert_eq!(record.display_name(), "Jane Doe");
    }

    #[test]
    fn test_primary_variant_lookup() {
        let entity = MasterEntity {
            entity_id: Uuid::new_v4(),
            entity_kind: EntityKind::Individual,
            primary_name: "Jane Doe".to_string(),
            name_variants: vec![
                NameVariant::legal("Jane Doe", "crm"),
                NameVariant::alias("J. Doe", "kyc"),
            ],
            date_of_birth: None,
            nationalities: Vec::new(),
            addresses: Vec::new(),
            identifiers: Vec::new(),
            relationships: Vec::new(),
            source_record_ids: Vec::new(),
            source_systems: Vec::new(),
            completeness_score: 0.0,
            overall_quality_score: 0.0,
            is_pep: false,
            is_sanctioned: false,
            is_on_watchlist: false,
            merge_history: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_resolved_at: None,
        };
        assert_eq!(entity.primary_variant().unwrap().full_name, "Jane Doe");
    }
}
