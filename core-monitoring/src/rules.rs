// =====================================================================================
// File: core-monitoring/src/rules.rs
// Description: Versioned monitoring rule definitions and registry
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use core_reference::SnapshotStore;

use crate::{
    error::{MonitoringError, MonitoringResult},
    types::{PatternSeverity, PatternType},
};

/// A versioned transaction-monitoring rule.
///
/// Mutating a rule bumps `version`; patterns emitted earlier keep referring
/// to the version that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRule {
    pub rule_id: Uuid,
    pub rule_code: String,
    pub rule_name: String,
    pub pattern_type: PatternType,
    pub description: String,
    pub parameters: HashMap<String, serde_json::Value>,
    pub thresholds: HashMap<String, f64>,
    pub base_severity: PatternSeverity,
    pub is_active: bool,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
    pub version: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl MonitoringRule {
    pub fn new(
        rule_code: &str,
        rule_name: &str,
        pattern_type: PatternType,
        base_severity: PatternSeverity,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            rule_id: Uuid::new_v4(),
            rule_code: rule_code.to_string(),
            rule_name: rule_name.to_string(),
            pattern_type,
            description: String::new(),
            parameters: HashMap::new(),
            thresholds: HashMap::new(),
            base_severity,
            is_active: true,
            effective_from: now,
            effective_to: None,
            version: 1,
            created_by: created_by.to_string(),
            created_at: now,
            last_modified_at: now,
        }
    }

    /// Numeric parameter with a fallback
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.parameters
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    /// Integer parameter with a fallback
    pub fn param_i64(&self, key: &str, default: i64) -> i64 {
        self.parameters
            .get(key)
            .and_then(|v| v.as_i64())
            .unwrap_or(default)
    }

    /// String-list parameter, empty when absent
    pub fn param_string_list(&self, key: &str) -> Vec<String> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Threshold with a fallback
    pub fn threshold(&self, key: &str, default: f64) -> f64 {
        self.thresholds.get(key).copied().unwrap_or(default)
    }
}

/// Immutable snapshot of the rule set plus every published version
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<Uuid, MonitoringRule>,
    versions: HashMap<(Uuid, u32), MonitoringRule>,
}

impl RuleSet {
    pub fn active_rules(&self) -> Vec<&MonitoringRule> {
        let mut rules: Vec<&MonitoringRule> =
            self.rules.values().filter(|r| r.is_active).collect();
        rules.sort_by(|a, b| a.rule_code.cmp(&b.rule_code));
        rules
    }

    pub fn get(&self, rule_id: &Uuid) -> Option<&MonitoringRule> {
        self.rules.get(rule_id)
    }

    pub fn get_version(&self, rule_id: &Uuid, version: u32) -> Option<&MonitoringRule> {
        self.versions.get(&(*rule_id, version))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn insert(&mut self, rule: MonitoringRule) {
        self.versions
            .insert((rule.rule_id, rule.version), rule.clone());
        self.rules.insert(rule.rule_id, rule);
    }
}

/// Copy-on-write registry of monitoring rules
pub struct RuleRegistry {
    rules: SnapshotStore<RuleSet>,
}

impl RuleRegistry {
    /// Registry seeded with the stock detection rules
    pub fn new() -> Self {
        let mut set = RuleSet::default();
        for rule in Self::default_rules() {
            set.insert(rule);
        }
        Self {
            rules: SnapshotStore::new(set),
        }
    }

    /// Registry without any rules
    pub fn empty() -> Self {
        Self {
            rules: SnapshotStore::default(),
        }
    }

    /// Current rule snapshot
    pub fn snapshot(&self) -> std::sync::Arc<RuleSet> {
        self.rules.load()
    }

    pub fn get_rule(&self, rule_id: Uuid) -> MonitoringResult<MonitoringRule> {
        self.snapshot().get(&rule_id).cloned().ok_or_else(|| {
            MonitoringError::not_found("rule".to_string(), rule_id.to_string())
        })
    }

    pub fn get_rule_by_code(&self, code: &str) -> Option<MonitoringRule> {
        self.snapshot()
            .rules
            .values()
            .find(|r| r.rule_code == code)
            .cloned()
    }

    /// The exact definition a pattern was produced by
    pub fn get_rule_version(&self, rule_id: Uuid, version: u32) -> MonitoringResult<MonitoringRule> {
        self.snapshot()
            .get_version(&rule_id, version)
            .cloned()
            .ok_or_else(|| {
                MonitoringError::not_found(
                    "rule version".to_string(),
                    format!("{rule_id} v{version}"),
                )
            })
    }

    /// Register a new rule
    pub fn create_rule(&self, rule: MonitoringRule) -> MonitoringResult<MonitoringRule> {
        if rule.rule_code.trim().is_empty() {
            return Err(MonitoringError::invalid("rule_code must not be empty"));
        }
        if self.get_rule_by_code(&rule.rule_code).is_some() {
            return Err(MonitoringError::invalid(format!(
                "rule_code already exists: {}",
                rule.rule_code
            )));
        }
        self.rules.update(|set| set.insert(rule.clone()));
        info!(rule_code = %rule.rule_code, "monitoring rule created");
        Ok(rule)
    }

    /// Apply changes to a rule, publishing a new version
    pub fn update_rule<F>(&self, rule_id: Uuid, mutate: F) -> MonitoringResult<MonitoringRule>
    where
        F: FnOnce(&mut MonitoringRule),
    {
        if self.snapshot().get(&rule_id).is_none() {
            return Err(MonitoringError::not_found(
                "rule".to_string(),
                rule_id.to_string(),
            ));
        }
        let mut updated: Option<MonitoringRule> = None;
        self.rules.update(|set| {
            if let Some(rule) = set.rules.get(&rule_id) {
                let mut next = rule.clone();
                mutate(&mut next);
                // Identity and lineage are registry-managed.
                next.rule_id = rule_id;
                next.version = rule.version + 1;
                next.last_modified_at = Utc::now();
                updated = Some(next.clone());
                set.insert(next);
            }
        });
        let updated = updated.expect("rule existed under the update lock");
        info!(rule_code = %updated.rule_code, version = updated.version, "monitoring rule updated");
        Ok(updated)
    }

    /// Enable or disable a rule without bumping the version
    pub fn toggle_rule(&self, rule_id: Uuid, is_active: bool) -> MonitoringResult<MonitoringRule> {
        if self.snapshot().get(&rule_id).is_none() {
            return Err(MonitoringError::not_found(
                "rule".to_string(),
                rule_id.to_string(),
            ));
        }
        let mut toggled: Option<MonitoringRule> = None;
        self.rules.update(|set| {
            if let Some(rule) = set.rules.get_mut(&rule_id) {
                rule.is_active = is_active;
                rule.last_modified_at = Utc::now();
                // The pinned definition in `versions` is left untouched:
                // activation is operational state, not part of the
                // definition a pattern was produced by.
                toggled = Some(rule.clone());
            }
        });
        Ok(toggled.expect("rule existed under the update lock"))
    }

    /// Stock rules shipped with the engine
    pub fn default_rules() -> Vec<MonitoringRule> {
        let mut rules = Vec::new();

        let mut structuring = MonitoringRule::new(
            "STRUCT_001",
            "Cash Structuring Detection",
            PatternType::Structuring,
            PatternSeverity::High,
            "system",
        );
        structuring.description =
            "Detect transactions just below the reporting threshold".to_string();
        structuring
            .parameters
            .insert("threshold".to_string(), serde_json::json!(10_000.0));
        structuring
            .parameters
            .insert("time_window_days".to_string(), serde_json::json!(1));
        structuring.thresholds.insert("count_threshold".to_string(), 3.0);
        structuring
            .thresholds
            .insert("total_threshold".to_string(), 25_000.0);
        rules.push(structuring);

        let mut velocity = MonitoringRule::new(
            "VEL_001",
            "Transaction Velocity Spike",
            PatternType::VelocitySpike,
            PatternSeverity::Medium,
            "system",
        );
        velocity.description =
            "Detect unusual increase in transaction frequency".to_string();
        velocity
            .parameters
            .insert("baseline_period_days".to_string(), serde_json::json!(90));
        velocity
            .parameters
            .insert("current_period_days".to_string(), serde_json::json!(7));
        velocity
            .thresholds
            .insert("threshold_multiplier".to_string(), 3.0);
        velocity.thresholds.insert("min_transactions".to_string(), 5.0);
        rules.push(velocity);

        let mut rapid = MonitoringRule::new(
            "RAP_001",
            "Rapid Movement of Funds",
            PatternType::RapidMovement,
            PatternSeverity::High,
            "system",
        );
        rapid.description = "Detect rapid in-and-out movement of funds".to_string();
        rapid
            .parameters
            .insert("threshold_hours".to_string(), serde_json::json!(24));
        rapid.thresholds.insert("ratio_threshold".to_string(), 0.9);
        rapid.thresholds.insert("min_amount".to_string(), 5_000.0);
        rules.push(rapid);

        let mut geo = MonitoringRule::new(
            "GEO_001",
            "High Risk Geography",
            PatternType::GeographicAnomaly,
            PatternSeverity::High,
            "system",
        );
        geo.description =
            "Detect transactions involving high risk jurisdictions".to_string();
        geo.parameters.insert(
            "high_risk_countries".to_string(),
            serde_json::json!(["AF", "IR", "KP", "SY", "YE"]),
        );
        rules.push(geo);

        let mut dormant = MonitoringRule::new(
            "DOR_001",
            "Dormant Account Activation",
            PatternType::DormantActivation,
            PatternSeverity::Medium,
            "system",
        );
        dormant.description =
            "Detect activity on previously dormant accounts".to_string();
        dormant
            .parameters
            .insert("dormancy_threshold_days".to_string(), serde_json::json!(180));
        dormant.thresholds.insert("min_amount".to_string(), 1_000.0);
        rules.push(dormant);

        let mut amount = MonitoringRule::new(
            "AMT_001",
            "Large Cash Transaction",
            PatternType::AmountAnomaly,
            PatternSeverity::Low,
            "system",
        );
        amount.description = "Detect large transactions".to_string();
        amount.thresholds.insert("threshold".to_string(), 10_000.0);
        rules.push(amount);

        let mut layering = MonitoringRule::new(
            "LAY_001",
            "Layering Chain Detection",
            PatternType::Layering,
            PatternSeverity::High,
            "system",
        );
        layering.description =
            "Detect chains of transfers through intermediary accounts".to_string();
        layering
            .parameters
            .insert("max_hops".to_string(), serde_json::json!(10));
        rules.push(layering);

        let mut round_trip = MonitoringRule::new(
            "RTR_001",
            "Round Tripping Detection",
            PatternType::RoundTripping,
            PatternSeverity::High,
            "system",
        );
        round_trip.description = "Detect funds returning to their origin".to_string();
        round_trip.thresholds.insert("ratio_threshold".to_string(), 0.8);
        rules.push(round_trip);

        rules
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_seeds_default_rules() {
        let registry = RuleRegistry::new();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 8);
        assert_eq!(snapshot.active_rules().len(), 8);
        assert!(registry.get_rule_by_code("STRUCT_001").is_some());
        assert!(registry.get_rule_by_code("GEO_001").is_some());
        assert!(registry.get_rule_by_code("RTR_001").is_some());
    }

    #[test]
    fn test_active_rules_sorted_by_code() {
        let registry = RuleRegistry::new();
        let snapshot = registry.snapshot();
        let codes: Vec<&str> = snapshot
            .active_rules()
            .iter()
            .map(|r| r.rule_code.as_str())
            .collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn test_update_bumps_version_and_keeps_history() {
        let registry = RuleRegistry::new();
        let rule = registry.get_rule_by_code("AMT_001").unwrap();
        assert_eq!(rule.version, 1);
        let original_threshold = rule.threshold("threshold", 0.0);

        let updated = registry
            .update_rule(rule.rule_id, |r| {
                r.thresholds.insert("threshold".to_string(), 20_000.0);
            })
            .unwrap();
        assert_eq!(updated.version, 2);

        // The prior version still resolves to its original definition.
        let v1 = registry.get_rule_version(rule.rule_id, 1).unwrap();
        assert_eq!(v1.threshold("threshold", 0.0), original_threshold);
        let v2 = registry.get_rule_version(rule.rule_id, 2).unwrap();
        assert_eq!(v2.threshold("threshold", 0.0), 20_000.0);
    }

    #[test]
    fn test_toggle_rule_deactivates() {
        let registry = RuleRegistry::new();
        let rule = registry.get_rule_by_code("VEL_001").unwrap();
        registry.toggle_rule(rule.rule_id, false).unwrap();
        assert_eq!(registry.snapshot().active_rules().len(), 7);
        // Toggling does not create a new version.
        assert_eq!(registry.get_rule(rule.rule_id).unwrap().version, 1);
    }

    #[test]
    fn test_create_duplicate_code_rejected() {
        let registry = RuleRegistry::new();
        let dup = MonitoringRule::new(
            "STRUCT_001",
            "Duplicate",
            PatternType::Structuring,
            PatternSeverity::Low,
            "tester",
        );
        assert!(registry.create_rule(dup).is_err());
    }

    #[test]
    fn test_unknown_rule_lookup_fails() {
        let registry = RuleRegistry::new();
        assert!(registry.get_rule(Uuid::new_v4()).is_err());
        let rule = registry.get_rule_by_code("RAP_001").unwrap();
        assert!(registry.get_rule_version(rule.rule_id, 99).is_err());
    }

    #[test]
    fn test_param_helpers() {
        let registry = RuleRegistry::new();
        let geo = registry.get_rule_by_code("GEO_001").unwrap();
        let countries = geo.param_string_list("high_risk_countries");
        assert!(countries.contains(&"IR".to_string()));
        assert_eq!(geo.param_f64("missing", 7.5), 7.5);
        assert_eq!(geo.param_i64("missing", 3), 3);
    }
}
