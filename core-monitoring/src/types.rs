// =====================================================================================
// File: core-monitoring/src/types.rs
// Description: Core types for transaction monitoring and pattern detection
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Direction of a transaction relative to the monitored account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Credit,
    Debit,
    Transfer,
}

/// Channel a transaction arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionChannel {
    Cash,
    Wire,
    Ach,
    Card,
    Online,
    Internal,
}

/// Immutable transaction input to the monitoring core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub customer_id: String,
    pub account_id: String,
    pub direction: TransactionDirection,
    pub amount: Decimal,
    pub currency: String,
    pub channel: TransactionChannel,
    pub source_account: Option<String>,
    pub target_account: Option<String>,
    pub counterparty_name: Option<String>,
    pub counterparty_country: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn is_cash(&self) -> bool {
        self.channel == TransactionChannel::Cash
    }
}

/// Pattern families the monitoring core can detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Structuring,
    Layering,
    RoundTripping,
    RapidMovement,
    VelocitySpike,
    GeographicAnomaly,
    DormantActivation,
    AmountAnomaly,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Structuring => "structuring",
            PatternType::Layering => "layering",
            PatternType::RoundTripping => "round_tripping",
            PatternType::RapidMovement => "rapid_movement",
            PatternType::VelocitySpike => "velocity_spike",
            PatternType::GeographicAnomaly => "geographic_anomaly",
            PatternType::DormantActivation => "dormant_activation",
            PatternType::AmountAnomaly => "amount_anomaly",
        }
    }
}

/// Severity assigned to a detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSeverity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

/// Review status of a detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    Detected,
    UnderReview,
    Confirmed,
    Dismissed,
    Escalated,
}

/// Confidence signals raised by the structuring detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuringIndicator {
    MultipleBelowThreshold,
    TotalExceedsThreshold,
    SimilarAmounts,
    RoundNumbers,
}

/// Pattern-specific detail payload.
///
/// Each detector family carries a typed variant; `Extension` preserves
/// forward compatibility for payloads this version does not know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternDetails {
    Structuring {
        reporting_threshold: Decimal,
        below_threshold_count: usize,
        below_threshold_total: Decimal,
        average_amount: Decimal,
        indicators: Vec<StructuringIndicator>,
    },
    Velocity {
        current_velocity: f64,
        baseline_velocity: f64,
        velocity_ratio: f64,
    },
    RapidMovement {
        credit_amount: Decimal,
        debit_amount: Decimal,
        time_diff_hours: f64,
        amount_ratio: f64,
    },
    Geographic {
        country: String,
        high_risk_countries: Vec<String>,
    },
    DormantActivation {
        days_dormant: i64,
        dormancy_threshold_days: i64,
    },
    AmountAnomaly {
        amount: Decimal,
        threshold: Decimal,
    },
    Layering {
        origin_entity: String,
        intermediate_entities: Vec<String>,
        final_entity: String,
        layer_count: usize,
    },
    RoundTripping {
        counterparty: String,
        outgoing_amount: Decimal,
        incoming_amount: Decimal,
    },
    Cycle {
        path: Vec<String>,
        node_count: usize,
    },
    Extension {
        fields: HashMap<String, serde_json::Value>,
    },
}

/// Historical velocity baseline used by the batch velocity detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityBaseline {
    pub avg_transaction_count: f64,
    pub avg_transaction_amount: f64,
    pub std_transaction_count: f64,
    pub std_transaction_amount: f64,
}

/// A pattern emitted by the rule engine or a batch detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub pattern_id: Uuid,
    pub pattern_type: PatternType,
    pub severity: PatternSeverity,
    pub status: PatternStatus,
    pub primary_entity_id: String,
    pub primary_entity_type: String,
    pub transaction_ids: Vec<Uuid>,
    pub transaction_count: usize,
    pub total_amount: Decimal,
    pub currency: String,
    /// Rule that produced the pattern, pinned to the version active at
    /// detection time
    pub rule_id: Uuid,
    pub rule_version: u32,
    pub rule_name: String,
    /// Confidence in [0, 1], copied verbatim from the evaluator
    pub confidence_score: f64,
    pub detected_at: DateTime<Utc>,
    pub details: PatternDetails,
}

/// Recent large credit summary used by the rapid-movement evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentCredit {
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Read-only sliding-window context supplied by the caller per transaction.
///
/// The rule engine owns no state between calls; every counter an evaluator
/// needs arrives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContext {
    pub customer_id: String,
    pub customer_name: String,
    /// Count of this customer's recent transactions in the structuring band
    pub recent_below_threshold_count: u32,
    pub current_transaction_velocity: f64,
    pub baseline_transaction_velocity: f64,
    pub last_large_credit: Option<RecentCredit>,
    pub days_since_last_activity: i64,
    pub expected_countries: Vec<String>,
}

impl CustomerContext {
    pub fn new(customer_id: &str, customer_name: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            customer_name: customer_name.to_string(),
            recent_below_threshold_count: 0,
            current_transaction_velocity: 0.0,
            baseline_transaction_velocity: 0.0,
            last_large_credit: None,
            days_since_last_activity: 0,
            expected_countries: Vec::new(),
        }
    }
}

/// Per-customer slice of a batch analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerBatch {
    pub customer_id: String,
    pub transactions: Vec<Transaction>,
}

/// Request for a batch pattern analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub request_id: Uuid,
    pub customers: Vec<CustomerBatch>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(customers: Vec<CustomerBatch>, requested_by: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            customers,
            requested_by: requested_by.to_string(),
            requested_at: Utc::now(),
        }
    }
}

/// Completion status of a batch analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Cancelled,
}

/// Result of a batch pattern analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub result_id: Uuid,
    pub request_id: Uuid,
    pub status: AnalysisStatus,
    pub customers_analyzed: usize,
    pub transactions_analyzed: usize,
    pub detectors_executed: usize,
    pub patterns: Vec<DetectedPattern>,
    pub errors: usize,
    pub analysis_date: DateTime<Utc>,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_is_cash() {
        let tx = Transaction {
            transaction_id: Uuid::new_v4(),
            customer_id: "C1".to_string(),
            account_id: "A1".to_string(),
            direction: TransactionDirection::Credit,
            amount: dec!(9500),
            currency: "USD".to_string(),
            channel: TransactionChannel::Cash,
            source_account: None,
            target_account: None,
            counterparty_name: None,
            counterparty_country: None,
            timestamp: Utc::now(),
        };
        assert!(tx.is_cash());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(PatternSeverity::Informational < PatternSeverity::Low);
        assert!(PatternSeverity::Low < PatternSeverity::Medium);
        assert!(PatternSeverity::Medium < PatternSeverity::High);
        assert!(PatternSeverity::High < PatternSeverity::Critical);
    }

    #[test]
    fn test_pattern_details_tagged_serialization() {
        let details = PatternDetails::Geographic {
            country: "IR".to_string(),
            high_risk_countries: vec!["IR".to_string(), "KP".to_string()],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "geographic");
        assert_eq!(json["country"], "IR");

        let back: PatternDetails = serde_json::from_value(json).unwrap();
        assert!(matches!(back, PatternDetails::Geographic { .. }));
    }

    #[test]
    fn test_customer_context_defaults() {
        let ctx = CustomerContext::new("C1", "Jane Roe");
        assert_eq!(ctx.recent_below_threshold_count, 0);
        assert!(ctx.last_large_credit.is_none());
    }
}
