// =====================================================================================
// File: core-resolution/src/rules.rs
// Description: Declarative resolution rules
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::EntityKind;

/// Declarative rule deciding when two records describe the same party.
///
/// Rules run in ascending `priority` order until one fires; the firing
/// rule's auto-merge settings decide whether the match is applied without
/// review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRule {
    pub rule_id: Uuid,
    pub rule_code: String,
    pub rule_name: String,
    pub entity_kind: EntityKind,
    pub match_fields: Vec<String>,
    pub field_weights: HashMap<String, f64>,
    /// Weighted score at which the rule fires
    pub threshold: f64,
    /// Score at which the rule merges without human review
    pub auto_merge_threshold: f64,
    pub auto_merge_enabled: bool,
    pub is_active: bool,
    pub priority: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ResolutionRule {
    fn new(
        rule_code: &str,
        rule_name: &str,
        entity_kind: EntityKind,
        priority: u32,
    ) -> Self {
        Self {
            rule_id: Uuid::new_v4(),
            rule_code: rule_code.to_string(),
            rule_name: rule_name.to_string(),
            entity_kind,
            match_fields: Vec::new(),
            field_weights: HashMap::new(),
            threshold: 0.85,
            auto_merge_threshold: 0.98,
            auto_merge_enabled: true,
            is_active: true,
            priority,
            created_by: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Weighted score over this rule's fields, given per-field scores
    pub fn score(&self, field_scores: &HashMap<String, f64>) -> f64 {
        let weight_sum: f64 = self
            .match_fields
            .iter()
            .filter_map(|f| self.field_weights.get(f))
            .sum();
        if weight_sum <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .match_fields
            .iter()
            .map(|field| {
                let weight = self.field_weights.get(field).copied().unwrap_or(0.0);
                let score = field_scores.get(field).copied().unwrap_or(0.0);
                weight * score
            })
            .sum();
        weighted / weight_sum
    }

    /// Stock rules evaluated in priority order
    pub fn default_rules() -> Vec<ResolutionRule> {
        let mut ssn = Self::new("SSN_EXACT", "Exact Tax ID Match", EntityKind::Individual, 1);
        ssn.match_fields = vec!["identifier".to_string()];
        ssn.field_weights.insert("identifier".to_string(), 1.0);
        ssn.threshold = 1.0;
        ssn.auto_merge_threshold = 1.0;

        let mut name_dob = Self::new("NAME_DOB", "Name + DOB Match", EntityKind::Individual, 2);
        name_dob.match_fields = vec!["name".to_string(), "dob".to_string()];
        name_dob.field_weights.insert("name".to_string(), 0.6);
        name_dob.field_weights.insert("dob".to_string(), 0.4);
        name_dob.threshold = 0.85;
        name_dob.auto_merge_threshold = 0.98;

        let mut name_addr =
            Self::new("NAME_ADDR", "Name + Address Match", EntityKind::Individual, 3);
        name_addr.match_fields = vec!["name".to_string(), "address".to_string()];
        name_addr.field_weights.insert("name".to_string(), 0.5);
        name_addr.field_weights.insert("address".to_string(), 0.5);
        name_addr.threshold = 0.80;
        name_addr.auto_merge_threshold = 0.95;

        let mut company = Self::new(
            "COMPANY_REG",
            "Company Registration Match",
            EntityKind::Organization,
            1,
        );
        company.match_fields = vec!["identifier".to_string(), "name".to_string()];
        company.field_weights.insert("identifier".to_string(), 0.8);
        company.field_weights.insert("name".to_string(), 0.2);
        company.threshold = 0.95;
        company.auto_merge_threshold = 1.0;

        vec![ssn, name_dob, name_addr, company]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_ordered_by_priority() {
        let rules = ResolutionRule::default_rules();
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].rule_code, "SSN_EXACT");
        assert_eq!(rules[0].priority, 1);
    }

    #[test]
    fn test_rule_score_normalizes_weights() {
        let rules = ResolutionRule::default_rules();
        let name_dob = rules.iter().find(|r| r.rule_code == "NAME_DOB").unwrap();

        let mut scores = HashMap::new();
        scores.insert("name".to_string(), 1.0);
        scores.insert("dob".to_string(), 1.0);
        assert!((name_dob.score(&scores) - 1.0).abs() < 1e-9);

        scores.insert("dob".to_string(), 0.0);
        assert!((name_dob.score(&scores) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_rule_score_empty_fields_is_zero() {
        let mut rule = ResolutionRule::default_rules().remove(0);
        rule.match_fields.clear();
        assert_eq!(rule.score(&HashMap::new()), 0.0);
    }
}
