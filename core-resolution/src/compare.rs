// =====================================================================================
// File: core-resolution/src/compare.rs
// Description: Pairwise comparison of source records and master entities
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use core_screening::matcher;

use crate::types::{MasterEntity, SourceRecord};

/// Standard comparison weights: name 0.40, identifier 0.25, dob 0.20,
/// address 0.15
pub const NAME_WEIGHT: f64 = 0.40;
pub const IDENTIFIER_WEIGHT: f64 = 0.25;
pub const DOB_WEIGHT: f64 = 0.20;
pub const ADDRESS_WEIGHT: f64 = 0.15;

/// Per-field similarity between a source record and a master entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldScores {
    pub name: f64,
    pub identifier: f64,
    pub dob: f64,
    pub address: f64,
    pub matching_fields: Vec<String>,
    pub non_matching_fields: Vec<String>,
}

impl FieldScores {
    /// Overall pairwise score. An exact identifier match short-circuits to
    /// 1.0; otherwise the standard weighted sum.
    pub fn overall(&self) -> f64 {
        if self.identifier >= 1.0 {
            return 1.0;
        }
        NAME_WEIGHT * self.name
            + IDENTIFIER_WEIGHT * self.identifier
            + DOB_WEIGHT * self.dob
            + ADDRESS_WEIGHT * self.address
    }

    /// Field-score map used by declarative rule scoring
    pub fn as_map(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("name".to_string(), self.name),
            ("identifier".to_string(), self.identifier),
            ("dob".to_string(), self.dob),
            ("address".to_string(), self.address),
        ])
    }
}

/// Compare every field of a source record against a master entity
pub fn compare_record_to_entity(record: &SourceRecord, entity: &MasterEntity) -> FieldScores {
    let mut scores = FieldScores::default();

    if !record.names.is_empty() && !entity.name_variants.is_empty() {
        scores.name = record
            .names
            .iter()
            .flat_map(|rec_name| {
                entity
                    .all_names()
                    .map(move |ent_name| matcher::name_similarity(&rec_name.full_name, ent_name))
            })
            .fold(0.0_f64, f64::max);
        if scores.name >= 0.7 {
            scores.matching_fields.push("name".to_string());
        } else {
            scores.non_matching_fields.push("name".to_string());
        }
    }

    if let (Some(rec_dob), Some(ent_dob)) = (record.date_of_birth, entity.date_of_birth) {
        if rec_dob == ent_dob {
            scores.dob = 1.0;
            scores.matching_fields.push("dob".to_string());
        } else {
            scores.non_matching_fields.push("dob".to_string());
        }
    }

    for rec_id in &record.identifiers {
        let matched = entity
            .identifiers
            .iter()
            .any(|ent_id| matcher::identifier_match(&rec_id.as_fields(), &ent_id.as_fields()));
        if matched {
            scores.identifier = 1.0;
            scores
                .matching_fields
                .push(format!("identifier:{}", rec_id.kind.as_str()));
            break;
        }
    }

    if !record.addresses.is_empty() && !entity.addresses.is_empty() {
        scores.address = record
            .addresses
            .iter()
            .flat_map(|rec_addr| {
                entity.addresses.iter().map(move |ent_addr| {
                    matcher::address_similarity(&rec_addr.as_fields(), &ent_addr.as_fields())
                })
            })
            .fold(0.0_f64, f64::max);
        if scores.address >= 0.7 {
            scores.matching_fields.push("address".to_string());
        } else {
            scores.non_matching_fields.push("address".to_string());
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AddressRecord, EntityKind, IdentifierKind, IdentifierRecord, MasterEntity, NameVariant,
    };
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn entity_with(
        name: &str,
        dob: Option<NaiveDate>,
        identifiers: Vec<IdentifierRecord>,
        addresses: Vec<AddressRecord>,
    ) -> MasterEntity {
        MasterEntity {
            entity_id: Uuid::new_v4(),
            entity_kind: EntityKind::Individual,
            primary_name: name.to_string(),
            name_variants: vec![NameVariant::legal(name, "crm")],
            date_of_birth: dob,
            nationalities: Vec::new(),
            addresses,
            identifiers,
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
        }
    }

    fn record_with(name: &str, dob: Option<NaiveDate>) -> SourceRecord {
        let mut record = SourceRecord::new("R1", "kyc", EntityKind::Individual);
        record.names.push(NameVariant::legal(name, "kyc"));
        record.date_of_birth = dob;
        record
    }

    #[test]
    fn test_identifier_short_circuit() {
        let ssn = IdentifierRecord::new(IdentifierKind::TaxId, "123-45-6789", "crm");
        let entity = entity_with("Jane Doe", None, vec![ssn.clone()], Vec::new());

        let mut record = record_with("Completely Different", None);
        record
            .identifiers
            .push(IdentifierRecord::new(IdentifierKind::TaxId, "123-45-6789", "kyc"));

        let scores = compare_record_to_entity(&record, &entity);
        assert_eq!(scores.identifier, 1.0);
        assert_eq!(scores.overall(), 1.0);
    }

    #[test]
    fn test_weighted_sum_without_identifier() {
        let dob = NaiveDate::from_ymd_opt(1990, 1, 1);
        let entity = entity_with("Jane Doe", dob, Vec::new(), Vec::new());
        let record = record_with("Jane Doe", dob);

        let scores = compare_record_to_entity(&record, &entity);
        assert_eq!(scores.name, 1.0);
        assert_eq!(scores.dob, 1.0);
        // 0.40 * 1.0 + 0.20 * 1.0
        assert!((scores.overall() - 0.6).abs() < 1e-9);
        assert!(scores.matching_fields.contains(&"name".to_string()));
        assert!(scores.matching_fields.contains(&"dob".to_string()));
    }

    #[test]
    fn test_dob_mismatch_counts_against() {
        let entity = entity_with(
            "Jane Doe",
            NaiveDate::from_ymd_opt(1990, 1, 1),
            Vec::new(),
            Vec::new(),
        );
        let record = record_with("Jane Doe", NaiveDate::from_ymd_opt(1991, 2, 2));
        let scores = compare_record_to_entity(&record, &entity);
        assert_eq!(scores.dob, 0.0);
        assert!(scores.non_matching_fields.contains(&"dob".to_string()));
    }

    #[test]
    fn test_address_contributes() {
        let entity = entity_with(
            "Jane Doe",
            None,
            Vec::new(),
            vec![AddressRecord::residential("12 Elm St", "Springfield", "US", "crm")],
        );
        let mut record = record_with("Jane Doe", None);
        record
            .addresses
            .push(AddressRecord::residential("12 Elm St", "springfield", "US", "kyc"));

        let scores = compare_record_to_entity(&record, &entity);
        assert_eq!(scores.address, 1.0);
        // 0.40 name + 0.15 address
        assert!((scores.overall() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fields_score_zero() {
        let entity = entity_with("Jane Doe", None, Vec::new(), Vec::new());
        let record = SourceRecord::new("R9", "kyc", EntityKind::Individual);
        let scores = compare_record_to_entity(&record, &entity);
        assert_eq!(scores.overall(), 0.0);
    }
}
