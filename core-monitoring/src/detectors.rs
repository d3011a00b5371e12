// =====================================================================================
// File: core-monitoring/src/detectors.rs
// Description: Batch graph and statistical pattern detectors
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{MonitoringError, MonitoringResult},
    flow,
    rules::{MonitoringRule, RuleRegistry},
    types::{
        DetectedPattern, PatternDetails, PatternStatus, PatternType, StructuringIndicator,
        Transaction, TransactionDirection, VelocityBaseline,
    },
};

/// Configuration for the batch detectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Cash reporting threshold the structuring detector works against
    pub reporting_threshold: Decimal,
    /// Lower bound of the just-below-threshold band, as a fraction
    pub structuring_band_ratio: f64,
    /// Amount variance below which amounts count as suspiciously similar
    pub similar_amount_variance: f64,
    /// Hours within which a credit-debit pair counts as rapid movement
    pub rapid_movement_hours: f64,
    /// Minimum debit/credit ratio for rapid movement
    pub rapid_movement_ratio: f64,
    /// Minimum amount for both legs of a rapid movement
    pub rapid_movement_min_amount: Decimal,
    /// Minimum inbound/outbound ratio for round-tripping
    pub round_trip_ratio: f64,
    /// Maximum hops followed by the layering traversal
    pub max_hops: usize,
    /// Bound on traversal start nodes to keep graph cost predictable
    pub max_traversal_starts: usize,
    /// Minimum distinct nodes for a cycle to count
    pub min_cycle_nodes: usize,
    /// Z-score at which velocity deviates significantly
    pub velocity_z_threshold: f64,
    /// Concurrent workers for batch analysis runs
    pub batch_concurrency: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            reporting_threshold: Decimal::new(10_000, 0),
            structuring_band_ratio: 0.8,
            similar_amount_variance: 1_000_000.0,
            rapid_movement_hours: 24.0,
            rapid_movement_ratio: 0.9,
            rapid_movement_min_amount: Decimal::new(5_000, 0),
            round_trip_ratio: 0.8,
            max_hops: 10,
            max_traversal_starts: 20,
            min_cycle_nodes: 3,
            velocity_z_threshold: 2.0,
            batch_concurrency: 4,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> MonitoringResult<()> {
        if self.reporting_threshold <= Decimal::ZERO {
            return Err(MonitoringError::configuration(
                "reporting_threshold must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.structuring_band_ratio) {
            return Err(MonitoringError::configuration(
                "structuring_band_ratio must be within [0, 1)",
            ));
        }
        if self.max_hops == 0 || self.max_traversal_starts == 0 {
            return Err(MonitoringError::configuration(
                "traversal bounds must be positive",
            ));
        }
        if self.min_cycle_nodes < 3 {
            return Err(MonitoringError::configuration(
                "min_cycle_nodes must be at least 3",
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(MonitoringError::configuration(
                "batch_concurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Batch pattern detectors over transaction sets.
///
/// Every emitted pattern pins the `(rule_id, rule_version)` of the registry
/// rule backing its detector.
pub struct PatternDetector {
    config: DetectorConfig,
    registry: Arc<RuleRegistry>,
}

impl PatternDetector {
    pub fn new(config: DetectorConfig, registry: Arc<RuleRegistry>) -> MonitoringResult<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn rule(&self, code: &str) -> MonitoringResult<MonitoringRule> {
        self.registry
            .get_rule_by_code(code)
            .ok_or_else(|| MonitoringError::not_found("rule".to_string(), code.to_string()))
    }

    /// Structuring over a customer's cash transactions in one window.
    ///
    /// Confidence stacks independent signals: several amounts just below
    /// the threshold, a combined total well above it, suspiciously similar
    /// amounts, and round-hundred amounts.
    pub fn detect_structuring(
        &self,
        customer_id: &str,
        transactions: &[Transaction],
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let rule = self.rule("STRUCT_001")?;
        let threshold = self.config.reporting_threshold;
        let band_floor = threshold
            * Decimal::try_from(self.config.structuring_band_ratio).unwrap_or(Decimal::new(8, 1));

        let cash: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.is_cash() && t.amount > Decimal::ZERO)
            .collect();
        if cash.len() < 2 {
            return Ok(None);
        }

        let below: Vec<&Transaction> = cash
            .iter()
            .copied()
            .filter(|t| t.amount >= band_floor && t.amount < threshold)
            .collect();
        if below.len() < 2 {
            return Ok(None);
        }

        let amounts: Vec<f64> = below
            .iter()
            .map(|t| t.amount.to_f64().unwrap_or(0.0))
            .collect();
        let total: Decimal = below.iter().map(|t| t.amount).sum();
        let total_f64 = total.to_f64().unwrap_or(0.0);
        let average = total_f64 / below.len() as f64;
        let variance =
            amounts.iter().map(|a| (a - average).powi(2)).sum::<f64>() / amounts.len() as f64;
        let round_hundreds = amounts.iter().filter(|a| *a % 100.0 == 0.0).count();
        let threshold_f64 = threshold.to_f64().unwrap_or(f64::MAX);

        let mut confidence: f64 = 0.0;
        let mut indicators = Vec::new();
        if below.len() >= 3 {
            confidence += 0.3;
            indicators.push(StructuringIndicator::MultipleBelowThreshold);
        }
        if total_f64 > threshold_f64 * 1.5 {
            confidence += 0.3;
            indicators.push(StructuringIndicator::TotalExceedsThreshold);
        }
        if variance < self.config.similar_amount_variance {
            confidence += 0.2;
            indicators.push(StructuringIndicator::SimilarAmounts);
        }
        if round_hundreds as f64 / amounts.len() as f64 > 0.5 {
            confidence += 0.2;
            indicators.push(StructuringIndicator::RoundNumbers);
        }

        if confidence < 0.5 {
            return Ok(None);
        }

        Ok(Some(DetectedPattern {
            pattern_id: Uuid::new_v4(),
            pattern_type: PatternType::Structuring,
            severity: rule.base_severity,
            status: PatternStatus::Detected,
            primary_entity_id: customer_id.to_string(),
            primary_entity_type: "customer".to_string(),
            transaction_ids: below.iter().map(|t| t.transaction_id).collect(),
            transaction_count: below.len(),
            total_amount: total,
            currency: below[0].currency.clone(),
            rule_id: rule.rule_id,
            rule_version: rule.version,
            rule_name: rule.rule_name.clone(),
            confidence_score: confidence.min(1.0),
            detected_at: Utc::now(),
            details: PatternDetails::Structuring {
                reporting_threshold: threshold,
                below_threshold_count: below.len(),
                below_threshold_total: total,
                average_amount: total / Decimal::from(below.len() as u64),
                indicators,
            },
        }))
    }

    /// Layering chains: simple transfer paths of three or more hops.
    ///
    /// The traversal keeps a per-path visited set and backtracks fully, so
    /// parallel branches cannot mask each other. Start nodes and path
    /// length are bounded to keep cost predictable on dense graphs.
    pub fn detect_layering(
        &self,
        transactions: &[Transaction],
    ) -> MonitoringResult<Vec<DetectedPattern>> {
        let rule = self.rule("LAY_001")?;
        let graph = flow::build_transaction_flow(transactions);
        let adjacency = flow::adjacency(&graph);

        let mut starts: Vec<&str> = adjacency.keys().copied().collect();
        starts.sort();
        starts.truncate(self.config.max_traversal_starts);

        let mut patterns = Vec::new();
        for start in starts {
            let mut path = vec![start.to_string()];
            let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
            let mut chain: Vec<Uuid> = Vec::new();
            let mut amounts: Vec<Decimal> = Vec::new();
            self.walk_chains(
                &rule,
                &adjacency,
                start,
                &mut path,
                &mut visited,
                &mut chain,
                &mut amounts,
                &mut patterns,
            );
        }
        Ok(patterns)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_chains(
        &self,
        rule: &MonitoringRule,
        adjacency: &HashMap<&str, Vec<&flow::FlowEdge>>,
        node: &str,
        path: &mut Vec<String>,
        visited: &mut HashSet<String>,
        chain: &mut Vec<Uuid>,
        amounts: &mut Vec<Decimal>,
        patterns: &mut Vec<DetectedPattern>,
    ) {
        if chain.len() >= self.config.max_hops {
            return;
        }
        let Some(edges) = adjacency.get(node) else {
            return;
        };
        for edge in edges {
            let target = edge.target_node_id.as_str();
            if visited.contains(target) {
                continue;
            }

            path.push(target.to_string());
            visited.insert(target.to_string());
            chain.push(edge.transaction_id);
            amounts.push(edge.amount);

            if chain.len() >= 3 {
                let confidence = (0.6 + 0.1 * (chain.len() as f64 - 3.0)).min(1.0);
                let total: Decimal = amounts.iter().copied().sum();
                patterns.push(DetectedPattern {
                    pattern_id: Uuid::new_v4(),
                    pattern_type: PatternType::Layering,
                    severity: rule.base_severity,
                    status: PatternStatus::Detected,
                    primary_entity_id: path[0].clone(),
                    primary_entity_type: "account".to_string(),
                    transaction_ids: chain.clone(),
                    transaction_count: chain.len(),
                    total_amount: total,
                    currency: edge.currency.clone(),
                    rule_id: rule.rule_id,
                    rule_version: rule.version,
                    rule_name: rule.rule_name.clone(),
                    confidence_score: confidence,
                    detected_at: Utc::now(),
                    details: PatternDetails::Layering {
                        origin_entity: path[0].clone(),
                        intermediate_entities: path[1..path.len() - 1].to_vec(),
                        final_entity: path[path.len() - 1].clone(),
                        layer_count: chain.len(),
                    },
                });
            }

            self.walk_chains(rule, adjacency, target, path, visited, chain, amounts, patterns);

            amounts.pop();
            chain.pop();
            visited.remove(target);
            path.pop();
        }
    }

    /// Round-tripping: funds leaving an account and returning from the same
    /// counterparty at eighty percent or more of the outbound amount. Only
    /// the account whose outbound leg came first is the origin.
    pub fn detect_round_tripping(
        &self,
        transactions: &[Transaction],
    ) -> MonitoringResult<Vec<DetectedPattern>> {
        let rule = self.rule("RTR_001")?;
        let ratio = Decimal::try_from(self.config.round_trip_ratio)
            .map_err(|_| MonitoringError::configuration("round_trip_ratio is not numeric"))?;

        let mut outbound: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        let mut inbound: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            if let Some(source) = tx.source_account.as_deref() {
                outbound.entry(source).or_default().push(tx);
            }
            if let Some(target) = tx.target_account.as_deref() {
                inbound.entry(target).or_default().push(tx);
            }
        }

        let mut patterns = Vec::new();
        for (account, outs) in &outbound {
            let Some(ins) = inbound.get(account) else {
                continue;
            };
            for out_tx in outs {
                let Some(counterparty) = out_tx.target_account.as_deref() else {
                    continue;
                };
                for in_tx in ins {
                    if in_tx.source_account.as_deref() != Some(counterparty) {
                        continue;
                    }
                    // The return leg must follow the outbound leg.
                    if in_tx.timestamp <= out_tx.timestamp {
                        continue;
                    }
                    if in_tx.amount < out_tx.amount * ratio {
                        continue;
                    }
                    patterns.push(DetectedPattern {
                        pattern_id: Uuid::new_v4(),
                        pattern_type: PatternType::RoundTripping,
                        severity: rule.base_severity,
                        status: PatternStatus::Detected,
                        primary_entity_id: account.to_string(),
                        primary_entity_type: "account".to_string(),
                        transaction_ids: vec![out_tx.transaction_id, in_tx.transaction_id],
                        transaction_count: 2,
                        total_amount: out_tx.amount + in_tx.amount,
                        currency: out_tx.currency.clone(),
                        rule_id: rule.rule_id,
                        rule_version: rule.version,
                        rule_name: rule.rule_name.clone(),
                        confidence_score: 0.8,
                        detected_at: Utc::now(),
                        details: PatternDetails::RoundTripping {
                            counterparty: counterparty.to_string(),
                            outgoing_amount: out_tx.amount,
                            incoming_amount: in_tx.amount,
                        },
                    });
                }
            }
        }
        Ok(patterns)
    }

    /// Multi-hop round-tripping: cycles of at least `min_cycle_nodes`
    /// distinct accounts, found by bounded DFS.
    pub fn detect_cycles(
        &self,
        transactions: &[Transaction],
    ) -> MonitoringResult<Vec<DetectedPattern>> {
        let rule = self.rule("RTR_001")?;
        let graph = flow::build_transaction_flow(transactions);
        let adjacency = flow::adjacency(&graph);

        let mut starts: Vec<&str> = adjacency.keys().copied().collect();
        starts.sort();
        starts.truncate(self.config.max_traversal_starts);

        let mut patterns = Vec::new();
        let mut seen_cycles: HashSet<Vec<String>> = HashSet::new();
        for start in starts {
            let mut path = vec![start.to_string()];
            let mut chain: Vec<Uuid> = Vec::new();
            let mut amounts: Vec<Decimal> = Vec::new();
            self.walk_cycles(
                &rule,
                &adjacency,
                start,
                start,
                &mut path,
                &mut chain,
                &mut amounts,
                &mut seen_cycles,
                &mut patterns,
            );
        }
        Ok(patterns)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_cycles(
        &self,
        rule: &MonitoringRule,
        adjacency: &HashMap<&str, Vec<&flow::FlowEdge>>,
        start: &str,
        node: &str,
        path: &mut Vec<String>,
        chain: &mut Vec<Uuid>,
        amounts: &mut Vec<Decimal>,
        seen_cycles: &mut HashSet<Vec<String>>,
        patterns: &mut Vec<DetectedPattern>,
    ) {
        if chain.len() >= self.config.max_hops {
            return;
        }
        let Some(edges) = adjacency.get(node) else {
            return;
        };
        for edge in edges {
            let target = edge.target_node_id.as_str();
            if target == start {
                if path.len() >= self.config.min_cycle_nodes {
                    // Canonical form: rotate so the smallest node leads,
                    // deduplicating the same cycle found from other starts.
                    let mut canonical = path.clone();
                    let min_pos = canonical
                        .iter()
                        .enumerate()
                        .min_by(|a, b| a.1.cmp(b.1))
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    canonical.rotate_left(min_pos);
                    if !seen_cycles.insert(canonical) {
                        continue;
                    }
                    let total: Decimal = amounts.iter().copied().sum::<Decimal>() + edge.amount;
                    let mut ids = chain.clone();
                    ids.push(edge.transaction_id);
                    patterns.push(DetectedPattern {
                        pattern_id: Uuid::new_v4(),
                        pattern_type: PatternType::RoundTripping,
                        severity: rule.base_severity,
                        status: PatternStatus::Detected,
                        primary_entity_id: start.to_string(),
                        primary_entity_type: "account".to_string(),
                        transaction_count: ids.len(),
                        transaction_ids: ids,
                        total_amount: total,
                        currency: edge.currency.clone(),
                        rule_id: rule.rule_id,
                        rule_version: rule.version,
                        rule_name: rule.rule_name.clone(),
                        confidence_score: 0.8,
                        detected_at: Utc::now(),
                        details: PatternDetails::Cycle {
                            path: path.clone(),
                            node_count: path.len(),
                        },
                    });
                }
                continue;
            }
            if path.contains(&target.to_string()) {
                continue;
            }

            path.push(target.to_string());
            chain.push(edge.transaction_id);
            amounts.push(edge.amount);
            self.walk_cycles(
                rule, adjacency, start, target, path, chain, amounts, seen_cycles, patterns,
            );
            amounts.pop();
            chain.pop();
            path.pop();
        }
    }

    /// Credit-debit pairs of one account inside the rapid-movement window
    pub fn detect_rapid_movement(
        &self,
        account_id: &str,
        transactions: &[Transaction],
    ) -> MonitoringResult<Vec<DetectedPattern>> {
        let rule = self.rule("RAP_001")?;
        let min_amount = self.config.rapid_movement_min_amount;

        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        sorted.sort_by_key(|t| t.timestamp);

        let credits: Vec<&Transaction> = sorted
            .iter()
            .copied()
            .filter(|t| t.direction == TransactionDirection::Credit && t.amount >= min_amount)
            .collect();
        let debits: Vec<&Transaction> = sorted
            .iter()
            .copied()
            .filter(|t| t.direction == TransactionDirection::Debit && t.amount >= min_amount)
            .collect();

        let mut patterns = Vec::new();
        for credit in &credits {
            for debit in &debits {
                if debit.timestamp <= credit.timestamp {
                    continue;
                }
                let hours =
                    (debit.timestamp - credit.timestamp).num_seconds() as f64 / 3600.0;
                if hours > self.config.rapid_movement_hours {
                    break;
                }
                let amount_ratio = if credit.amount.is_zero() {
                    0.0
                } else {
                    (debit.amount / credit.amount).to_f64().unwrap_or(0.0)
                };
                if amount_ratio < self.config.rapid_movement_ratio {
                    continue;
                }
                patterns.push(DetectedPattern {
                    pattern_id: Uuid::new_v4(),
                    pattern_type: PatternType::RapidMovement,
                    severity: rule.base_severity,
                    status: PatternStatus::Detected,
                    primary_entity_id: account_id.to_string(),
                    primary_entity_type: "account".to_string(),
                    transaction_ids: vec![credit.transaction_id, debit.transaction_id],
                    transaction_count: 2,
                    total_amount: credit.amount + debit.amount,
                    currency: credit.currency.clone(),
                    rule_id: rule.rule_id,
                    rule_version: rule.version,
                    rule_name: rule.rule_name.clone(),
                    confidence_score: 0.80,
                    detected_at: Utc::now(),
                    details: PatternDetails::RapidMovement {
                        credit_amount: credit.amount,
                        debit_amount: debit.amount,
                        time_diff_hours: hours,
                        amount_ratio,
                    },
                });
            }
        }
        Ok(patterns)
    }

    /// Velocity deviation from a historical baseline, by z-score
    pub fn detect_velocity_anomaly(
        &self,
        customer_id: &str,
        current: &[Transaction],
        baseline: &VelocityBaseline,
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let rule = self.rule("VEL_001")?;
        if current.is_empty() {
            return Ok(None);
        }

        let count = current.len() as f64;
        let amount: f64 = current
            .iter()
            .map(|t| t.amount.to_f64().unwrap_or(0.0))
            .sum();

        let count_z = if baseline.std_transaction_count > 0.0 {
            (count - baseline.avg_transaction_count) / baseline.std_transaction_count
        } else {
            0.0
        };
        let amount_z = if baseline.std_transaction_amount > 0.0 {
            (amount - baseline.avg_transaction_amount) / baseline.std_transaction_amount
        } else {
            0.0
        };

        if count_z.abs() < self.config.velocity_z_threshold
            && amount_z.abs() < self.config.velocity_z_threshold
        {
            return Ok(None);
        }

        let confidence = ((count_z.abs() + amount_z.abs()) / 10.0).min(1.0);
        let total: Decimal = current.iter().map(|t| t.amount).sum();
        Ok(Some(DetectedPattern {
            pattern_id: Uuid::new_v4(),
            pattern_type: PatternType::VelocitySpike,
            severity: rule.base_severity,
            status: PatternStatus::Detected,
            primary_entity_id: customer_id.to_string(),
            primary_entity_type: "customer".to_string(),
            transaction_ids: current.iter().map(|t| t.transaction_id).collect(),
            transaction_count: current.len(),
            total_amount: total,
            currency: current[0].currency.clone(),
            rule_id: rule.rule_id,
            rule_version: rule.version,
            rule_name: rule.rule_name.clone(),
            confidence_score: confidence,
            detected_at: Utc::now(),
            details: PatternDetails::Velocity {
                current_velocity: count,
                baseline_velocity: baseline.avg_transaction_count,
                velocity_ratio: if baseline.avg_transaction_count > 0.0 {
                    count / baseline.avg_transaction_count
                } else {
                    0.0
                },
            },
        }))
    }

    /// Activity in countries outside the customer's expected footprint
    pub fn detect_geographic_anomaly(
        &self,
        customer_id: &str,
        transactions: &[Transaction],
        expected_countries: &[String],
        high_risk_countries: &[String],
    ) -> MonitoringResult<Option<DetectedPattern>> {
        let rule = self.rule("GEO_001")?;
        if transactions.is_empty() {
            return Ok(None);
        }

        let mut actual: Vec<String> = Vec::new();
        for tx in transactions {
            if let Some(country) = &tx.counterparty_country {
                if !actual.contains(country) {
                    actual.push(country.clone());
                }
            }
        }

        let unusual: Vec<String> = actual
            .iter()
            .filter(|c| !expected_countries.contains(c))
            .cloned()
            .collect();
        let high_risk: Vec<String> = actual
            .iter()
            .filter(|c| high_risk_countries.contains(c))
            .cloned()
            .collect();
        if unusual.is_empty() && high_risk.is_empty() {
            return Ok(None);
        }

        let mut confidence: f64 = 0.5;
        if !high_risk.is_empty() {
            confidence += 0.3;
        }
        if unusual.len() > 2 {
            confidence += 0.2;
        }

        let flagged: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| {
                t.counterparty_country
                    .as_ref()
                    .map(|c| unusual.contains(c) || high_risk.contains(c))
                    .unwrap_or(false)
            })
            .collect();
        let total: Decimal = flagged.iter().map(|t| t.amount).sum();

        Ok(Some(DetectedPattern {
            pattern_id: Uuid::new_v4(),
            pattern_type: PatternType::GeographicAnomaly,
            severity: rule.base_severity,
            status: PatternStatus::Detected,
            primary_entity_id: customer_id.to_string(),
            primary_entity_type: "customer".to_string(),
            transaction_ids: flagged.iter().map(|t| t.transaction_id).collect(),
            transaction_count: flagged.len(),
            total_amount: total,
            currency: transactions[0].currency.clone(),
            rule_id: rule.rule_id,
            rule_version: rule.version,
            rule_name: rule.rule_name.clone(),
            confidence_score: confidence.min(1.0),
            detected_at: Utc::now(),
            details: PatternDetails::Geographic {
                country: high_risk
                    .first()
                    .or(unusual.first())
                    .cloned()
                    .unwrap_or_default(),
                high_risk_countries: high_risk,
            },
        }))
    }
}
