// =====================================================================================
// File: core-monitoring/src/engine.rs
// Description: Per-transaction rule evaluation engine
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{MonitoringError, MonitoringResult},
    rules::{MonitoringRule, RuleRegistry},
    types::{
        CustomerContext, DetectedPattern, PatternDetails, PatternStatus, PatternType, Transaction,
        TransactionDirection,
    },
};

/// Outcome of evaluating one transaction against the active rule set
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub patterns: Vec<DetectedPattern>,
    pub rules_executed: usize,
    pub rule_errors: usize,
}

/// Realtime rule engine.
///
/// Evaluation is synchronous and touches no I/O: rules come from the current
/// registry snapshot and every sliding counter arrives in the caller-built
/// [`CustomerContext`]. The engine owns no state between calls.
pub struct RuleEngine {
    registry: Arc<RuleRegistry>,
}

impl RuleEngine {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Evaluate one transaction, returning every pattern the active rules
    /// detect
    pub fn evaluate(&self, tx: &Transaction, ctx: &CustomerContext) -> Vec<DetectedPattern> {
        self.evaluate_detailed(tx, ctx).patterns
    }

    /// Evaluate with per-rule error accounting. A failing rule is logged and
    /// counted; the remaining rules still run.
    pub fn evaluate_detailed(&self, tx: &Transaction, ctx: &CustomerContext) -> EvaluationOutcome {
        let snapshot = self.registry.snapshot();
        let mut outcome = EvaluationOutcome {
            patterns: Vec::new(),
            rules_executed: 0,
            rule_errors: 0,
        };

        for rule in snapshot.active_rules() {
            outcome.rules_executed += 1;
            match self.evaluate_rule(rule, tx, ctx) {
                Ok(Some(pattern)) => {
                    debug!(
                        rule = %rule.rule_code,
                        pattern = pattern.pattern_type.as_str(),
                        confidence = pattern.confidence_score,
                        "pattern detected"
                    );
                    outcome.patterns.push(pattern);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(rule = %rule.rule_code, error = %err, "rule evaluation failed");
                    outcome.rule_errors += 1;
                }
            }
        }
        outcome
    }

    fn evaluate_rule(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
        ctx: &CustomerContext,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        match rule.pattern_type {
            PatternType::Structuring => self.check_structuring(rule, tx, ctx),
            PatternType::VelocitySpike => self.check_velocity(rule, tx, ctx),
            PatternType::RapidMovement => self.check_rapid_movement(rule, tx, ctx),
            PatternType::GeographicAnomaly => self.check_geographic(rule, tx),
            PatternType::DormantActivation => self.check_dormant_activation(rule, tx, ctx),
            PatternType::AmountAnomaly => self.check_amount_anomaly(rule, tx),
            // Graph-based patterns only exist on the batch path.
            PatternType::Layering | PatternType::RoundTripping => Ok(None),
        }
    }

    /// Amount in the band just below the reporting threshold while the
    /// sliding window already holds N-1 similar transactions
    fn check_structuring(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
        ctx: &CustomerContext,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let threshold = decimal_param(rule, "threshold", 10_000.0)?;
        let band_floor = threshold * Decimal::new(8, 1);
        let count_threshold = rule.threshold("count_threshold", 3.0) as u32;

        if tx.amount >= band_floor
            && tx.amount < threshold
            && ctx.recent_below_threshold_count >= count_threshold.saturating_sub(1)
        {
            return Ok(Some(self.pattern_from_rule(
                rule,
                tx,
                0.85,
                PatternDetails::Structuring {
                    reporting_threshold: threshold,
                    below_threshold_count: ctx.recent_below_threshold_count as usize + 1,
                    below_threshold_total: tx.amount,
                    average_amount: tx.amount,
                    indicators: vec![crate::types::StructuringIndicator::MultipleBelowThreshold],
                },
            )));
        }
        Ok(None)
    }

    /// Current velocity exceeding the baseline by the configured multiplier
    fn check_velocity(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
        ctx: &CustomerContext,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let multiplier = rule.threshold("threshold_multiplier", 3.0);
        let baseline = ctx.baseline_transaction_velocity;
        let current = ctx.current_transaction_velocity;

        if baseline > 0.0 && current > baseline * multiplier {
            return Ok(Some(self.pattern_from_rule(
                rule,
                tx,
                0.75,
                PatternDetails::Velocity {
                    current_velocity: current,
                    baseline_velocity: baseline,
                    velocity_ratio: current / baseline,
                },
            )));
        }
        Ok(None)
    }

    /// Debit shortly after a large credit moving most of it back out
    fn check_rapid_movement(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
        ctx: &CustomerContext,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let credit = match &ctx.last_large_credit {
            Some(credit) => credit,
            None => return Ok(None),
        };
        if tx.direction != TransactionDirection::Debit {
            return Ok(None);
        }

        let min_amount = decimal_threshold(rule, "min_amount", 5_000.0)?;
        if tx.amount < min_amount || credit.amount < min_amount {
            return Ok(None);
        }

        let threshold_hours = rule.param_f64("threshold_hours", 24.0);
        let elapsed_hours =
            (tx.timestamp - credit.timestamp).num_seconds() as f64 / 3600.0;
        if elapsed_hours < 0.0 || elapsed_hours >= threshold_hours {
            return Ok(None);
        }

        let ratio = ratio_f64(tx.amount, credit.amount);
        if ratio < rule.threshold("ratio_threshold", 0.9) {
            return Ok(None);
        }

        let mut pattern = self.pattern_from_rule(
            rule,
            tx,
            0.80,
            PatternDetails::RapidMovement {
                credit_amount: credit.amount,
                debit_amount: tx.amount,
                time_diff_hours: elapsed_hours,
                amount_ratio: ratio,
            },
        );
        pattern.transaction_ids = vec![credit.transaction_id, tx.transaction_id];
        pattern.transaction_count = 2;
        pattern.total_amount = credit.amount + tx.amount;
        Ok(Some(pattern))
    }

    /// Counterparty country on the rule's high-risk list
    fn check_geographic(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let high_risk = rule.param_string_list("high_risk_countries");
        let country = match &tx.counterparty_country {
            Some(country) => country,
            None => return Ok(None),
        };

        if high_risk.iter().any(|c| c == country) {
            return Ok(Some(self.pattern_from_rule(
                rule,
                tx,
                0.90,
                PatternDetails::Geographic {
                    country: country.clone(),
                    high_risk_countries: high_risk,
                },
            )));
        }
        Ok(None)
    }

    /// Material activity on an account that has been quiet past the
    /// dormancy threshold
    fn check_dormant_activation(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
        ctx: &CustomerContext,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let dormancy_days = rule.param_i64("dormancy_threshold_days", 180);
        let min_amount = decimal_threshold(rule, "min_amount", 1_000.0)?;

        if ctx.days_since_last_activity > dormancy_days && tx.amount >= min_amount {
            return Ok(Some(self.pattern_from_rule(
                rule,
                tx,
                0.70,
                PatternDetails::DormantActivation {
                    days_dormant: ctx.days_since_last_activity,
                    dormancy_threshold_days: dormancy_days,
                },
            )));
        }
        Ok(None)
    }

    /// Plain large-amount trigger
    fn check_amount_anomaly(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let threshold = decimal_threshold(rule, "threshold", 10_000.0)?;
        if tx.amount >= threshold {
            return Ok(Some(self.pattern_from_rule(
                rule,
                tx,
                1.0,
                PatternDetails::AmountAnomaly {
                    amount: tx.amount,
                    threshold,
                },
            )));
        }
        Ok(None)
    }

    fn pattern_from_rule(
        &self,
        rule: &MonitoringRule,
        tx: &Transaction,
        confidence: f64,
        details: PatternDetails,
    ) -> DetectedPattern {
        DetectedPattern {
            pattern_id: Uuid::new_v4(),
            pattern_type: rule.pattern_type,
            severity: rule.base_severity,
            status: PatternStatus::Detected,
            primary_entity_id: tx.customer_id.clone(),
            primary_entity_type: "customer".to_string(),
            transaction_ids: vec![tx.transaction_id],
            transaction_count: 1,
            total_amount: tx.amount,
            currency: tx.currency.clone(),
            rule_id: rule.rule_id,
            rule_version: rule.version,
            rule_name: rule.rule_name.clone(),
            confidence_score: confidence,
            detected_at: Utc::now(),
            details,
        }
    }
}

fn decimal_param(rule: &MonitoringRule, key: &str, default: f64) -> MonitoringResult<Decimal> {
    Decimal::try_from(rule.param_f64(key, default)).map_err(|_| {
        MonitoringError::configuration(format!("rule {}: parameter {key} is not numeric", rule.rule_code))
    })
}

fn decimal_threshold(rule: &MonitoringRule, key: &str, default: f64) -> MonitoringResult<Decimal> {
    Decimal::try_from(rule.threshold(key, default)).map_err(|_| {
        MonitoringError::configuration(format!("rule {}: threshold {key} is not numeric", rule.rule_code))
    })
}

fn ratio_f64(numerator: Decimal, denominator: Decimal) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    (numerator / denominator).to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecentCredit, TransactionChannel};
    use rust_decimal_macros::dec;

    fn tx(amount: Decimal, direction: TransactionDirection) -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            customer_id: "C1".to_string(),
            account_id: "A1".to_string(),
            direction,
            amount,
            currency: "USD".to_string(),
            channel: TransactionChannel::Cash,
            source_account: None,
            target_account: None,
            counterparty_name: None,
            counterparty_country: None,
            timestamp: Utc::now(),
        }
    }

    fn engine() -> RuleEngine {
        RuleEngine::new(Arc::new(RuleRegistry::new()))
    }

    fn has_pattern(patterns: &[DetectedPattern], pattern_type: PatternType) -> bool {
        patterns.iter().any(|p| p.pattern_type == pattern_type)
    }

    #[test]
    fn test_structuring_detected_in_band_with_history() {
        let engine = engine();
        let mut ctx = CustomerContext::new("C1", "Jane Roe");
        ctx.recent_below_threshold_count = 2;

        let patterns = engine.evaluate(&tx(dec!(9500), TransactionDirection::Credit), &ctx);
        assert!(has_pattern(&patterns, PatternType::Structuring));

        let structuring = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::Structuring)
            .unwrap();
        assert_eq!(structuring.confidence_score, 0.85);
        assert_eq!(structuring.rule_version, 1);
    }

    #[test]
    fn test_structuring_needs_window_history() {
        let engine = engine();
        let ctx = CustomerContext::new("C1", "Jane Roe");
        let patterns = engine.evaluate(&tx(dec!(9500), TransactionDirection::Credit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::Structuring));
    }

    #[test]
    fn test_structuring_band_excludes_threshold() {
        let engine = engine();
        let mut ctx = CustomerContext::new("C1", "Jane Roe");
        ctx.recent_below_threshold_count = 5;

        // At the threshold the amount-anomaly rule fires instead.
        let patterns = engine.evaluate(&tx(dec!(10000), TransactionDirection::Credit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::Structuring));
        assert!(has_pattern(&patterns, PatternType::AmountAnomaly));
    }

    #[test]
    fn test_velocity_spike_requires_baseline() {
        let engine = engine();
        let mut ctx = CustomerContext::new("C1", "Jane Roe");
        ctx.current_transaction_velocity = 30.0;
        ctx.baseline_transaction_velocity = 0.0;
        let patterns = engine.evaluate(&tx(dec!(100), TransactionDirection::Debit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::VelocitySpike));

        ctx.baseline_transaction_velocity = 5.0;
        let patterns = engine.evaluate(&tx(dec!(100), TransactionDirection::Debit), &ctx);
        assert!(has_pattern(&patterns, PatternType::VelocitySpike));
    }

    #[test]
    fn test_rapid_movement_detected_within_window() {
        let engine = engine();
        let mut ctx = CustomerContext::new("C1", "Jane Roe");
        ctx.last_large_credit = Some(RecentCredit {
            transaction_id: Uuid::new_v4(),
            amount: dec!(10000),
            timestamp: Utc::now() - chrono::Duration::hours(6),
        });

        let patterns = engine.evaluate(&tx(dec!(9600), TransactionDirection::Debit), &ctx);
        let rapid = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::RapidMovement)
            .expect("rapid movement pattern");
        assert_eq!(rapid.transaction_count, 2);
        assert_eq!(rapid.confidence_score, 0.80);
        match &rapid.details {
            PatternDetails::RapidMovement { amount_ratio, .. } => {
                assert!(*amount_ratio >= 0.9)
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_rapid_movement_respects_window_and_ratio() {
        let engine = engine();
        let mut ctx = CustomerContext::new("C1", "Jane Roe");
        ctx.last_large_credit = Some(RecentCredit {
            transaction_id: Uuid::new_v4(),
            amount: dec!(10000),
            timestamp: Utc::now() - chrono::Duration::hours(30),
        });
        // Outside the 24h window.
        let patterns = engine.evaluate(&tx(dec!(9600), TransactionDirection::Debit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::RapidMovement));

        // Inside the window but only half the credit moved out.
        ctx.last_large_credit.as_mut().unwrap().timestamp = Utc::now() - chrono::Duration::hours(2);
        let patterns = engine.evaluate(&tx(dec!(5000), TransactionDirection::Debit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::RapidMovement));
    }

    #[test]
    fn test_geographic_anomaly_on_high_risk_country() {
        let engine = engine();
        let ctx = CustomerContext::new("C1", "Jane Roe");
        let mut transaction = tx(dec!(500), TransactionDirection::Debit);
        transaction.counterparty_country = Some("IR".to_string());

        let patterns = engine.evaluate(&transaction, &ctx);
        let geo = patterns
            .iter()
            .find(|p| p.pattern_type == PatternType::GeographicAnomaly)
            .expect("geographic pattern");
        assert_eq!(geo.confidence_score, 0.90);

        transaction.counterparty_country = Some("DE".to_string());
        let patterns = engine.evaluate(&transaction, &ctx);
        assert!(!has_pattern(&patterns, PatternType::GeographicAnomaly));
    }

    #[test]
    fn test_dormant_activation() {
        let engine = engine();
        let mut ctx = CustomerContext::new("C1", "Jane Roe");
        ctx.days_since_last_activity = 200;

        let patterns = engine.evaluate(&tx(dec!(2500), TransactionDirection::Credit), &ctx);
        assert!(has_pattern(&patterns, PatternType::DormantActivation));

        // Small amounts on dormant accounts stay quiet.
        let patterns = engine.evaluate(&tx(dec!(500), TransactionDirection::Credit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::DormantActivation));
    }

    #[test]
    fn test_amount_anomaly_copies_rule_version() {
        let engine = engine();
        let registry = engine.registry().clone();
        let rule = registry.get_rule_by_code("AMT_001").unwrap();
        let ctx = CustomerContext::new("C1", "Jane Roe");

        let before = engine.evaluate(&tx(dec!(15000), TransactionDirection::Credit), &ctx);
        let amt_before = before
            .iter()
            .find(|p| p.pattern_type == PatternType::AmountAnomaly)
            .unwrap();
        assert_eq!(amt_before.rule_version, 1);

        registry
            .update_rule(rule.rule_id, |r| {
                r.thresholds.insert("threshold".to_string(), 12_000.0);
            })
            .unwrap();

        let after = engine.evaluate(&tx(dec!(15000), TransactionDirection::Credit), &ctx);
        let amt_after = after
            .iter()
            .find(|p| p.pattern_type == PatternType::AmountAnomaly)
            .unwrap();
        assert_eq!(amt_after.rule_version, 2);

        // The earlier pattern's pinned version still resolves to the old
        // definition.
        let pinned = registry
            .get_rule_version(amt_before.rule_id, amt_before.rule_version)
            .unwrap();
        assert_eq!(pinned.threshold("threshold", 0.0), 10_000.0);
    }

    #[test]
    fn test_inactive_rules_do_not_fire() {
        let engine = engine();
        let registry = engine.registry().clone();
        let rule = registry.get_rule_by_code("AMT_001").unwrap();
        registry.toggle_rule(rule.rule_id, false).unwrap();

        let ctx = CustomerContext::new("C1", "Jane Roe");
        let patterns = engine.evaluate(&tx(dec!(15000), TransactionDirection::Credit), &ctx);
        assert!(!has_pattern(&patterns, PatternType::AmountAnomaly));
    }

    #[test]
    fn test_evaluator_errors_are_contained() {
        let registry = Arc::new(RuleRegistry::empty());
        // A threshold that cannot convert to a money amount makes the
        // evaluator fail; the engine must count it and keep going.
        registry
            .create_rule({
                let mut rule = crate::rules::MonitoringRule::new(
                    "BAD_001",
                    "Misconfigured",
                    PatternType::AmountAnomaly,
                    crate::types::PatternSeverity::Low,
                    "tester",
                );
                rule.thresholds.insert("threshold".to_string(), f64::NAN);
                rule
            })
            .unwrap();
        registry
            .create_rule({
                let mut rule = crate::rules::MonitoringRule::new(
                    "AMT_900",
                    "Large Amount",
                    PatternType::AmountAnomaly,
                    crate::types::PatternSeverity::Low,
                    "tester",
                );
                rule.thresholds.insert("threshold".to_string(), 1_000.0);
                rule
            })
            .unwrap();

        let engine = RuleEngine::new(registry);
        let ctx = CustomerContext::new("C1", "Jane Roe");
        let outcome = engine.evaluate_detailed(&tx(dec!(5000), TransactionDirection::Credit), &ctx);

        assert_eq!(outcome.rules_executed, 2);
        assert_eq!(outcome.rule_errors, 1);
        assert_eq!(outcome.patterns.len(), 1);
    }
}
