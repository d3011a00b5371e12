// =====================================================================================
// File: core-risk/src/types.rs
// Description: Core types for customer risk profiling
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RiskError, RiskResult};

/// Customer risk classification.
///
/// `Prohibited` is assigned administratively through an approved override
/// and is never produced by scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerRiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
    Prohibited,
}

impl CustomerRiskLevel {
    /// Level implied by a 0-100 overall score
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            CustomerRiskLevel::VeryHigh
        } else if score >= 60.0 {
            CustomerRiskLevel::High
        } else if score >= 40.0 {
            CustomerRiskLevel::Medium
        } else {
            CustomerRiskLevel::Low
        }
    }

    /// Review cadence in months; zero means continuous review
    pub fn review_frequency_months(&self) -> u32 {
        match self {
            CustomerRiskLevel::Low => 36,
            CustomerRiskLevel::Medium => 12,
            CustomerRiskLevel::High => 6,
            CustomerRiskLevel::VeryHigh => 3,
            CustomerRiskLevel::Prohibited => 0,
        }
    }

    /// Ordinal rank used to measure upward moves
    pub fn rank(&self) -> u8 {
        match self {
            CustomerRiskLevel::Low => 0,
            CustomerRiskLevel::Medium => 1,
            CustomerRiskLevel::High => 2,
            CustomerRiskLevel::VeryHigh => 3,
            CustomerRiskLevel::Prohibited => 4,
        }
    }
}

/// Legal form of the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Individual,
    SoleProprietor,
    Partnership,
    Corporation,
    Llc,
    NonProfit,
    Government,
    Trust,
    FinancialInstitution,
}

/// Politically-exposed-person status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PepStatus {
    NotPep,
    Pep,
    PepFamily,
    PepAssociate,
}

/// Category a risk factor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorCategory {
    Geography,
    Product,
    Channel,
    Customer,
    Transaction,
    Industry,
}

/// Individual risk factor identified on a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor_id: Uuid,
    pub category: RiskFactorCategory,
    pub factor_code: String,
    pub factor_name: String,
    pub description: String,
    pub weight: f64,
    pub score: f64,
    pub identified_at: DateTime<Utc>,
}

impl RiskFactor {
    pub fn new(
        category: RiskFactorCategory,
        factor_code: &str,
        factor_name: &str,
        description: &str,
        weight: f64,
        score: f64,
    ) -> Self {
        Self {
            factor_id: Uuid::new_v4(),
            category,
            factor_code: factor_code.to_string(),
            factor_name: factor_name.to_string(),
            description: description.to_string(),
            weight,
            score,
            identified_at: Utc::now(),
        }
    }
}

/// Summary of a customer's observed transaction behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub customer_id: String,
    pub avg_monthly_transaction_count: f64,
    pub avg_transaction_size: f64,
    pub typical_countries: Vec<String>,
    /// Fraction of value exposed to high-risk countries, in [0, 1]
    pub high_risk_country_exposure: f64,
    pub primary_channels: Vec<String>,
    pub product_types_used: Vec<String>,
    pub velocity_score: f64,
    pub consistency_score: f64,
    pub diversity_score: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl BehaviorProfile {
    pub fn empty(customer_id: &str) -> Self {
        let now = Utc::now();
        Self {
            customer_id: customer_id.to_string(),
            avg_monthly_transaction_count: 0.0,
            avg_transaction_size: 0.0,
            typical_countries: Vec::new(),
            high_risk_country_exposure: 0.0,
            primary_channels: Vec::new(),
            product_types_used: Vec::new(),
            velocity_score: 0.0,
            consistency_score: 100.0,
            diversity_score: 0.0,
            period_start: now,
            period_end: now,
        }
    }
}

/// What prompted an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentTrigger {
    Onboarding,
    Periodic,
    EventTriggered,
}

/// Outcome of one risk assessment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRiskAssessment {
    pub assessment_id: Uuid,
    pub customer_id: String,
    pub assessment_date: DateTime<Utc>,
    pub trigger: AssessmentTrigger,
    pub risk_level: CustomerRiskLevel,
    /// Overall score in [0, 100]
    pub overall_risk_score: f64,
    pub geography_risk_score: f64,
    pub product_risk_score: f64,
    pub channel_risk_score: f64,
    pub customer_risk_score: f64,
    pub transaction_risk_score: f64,
    pub industry_risk_score: f64,
    pub risk_factors: Vec<RiskFactor>,
    pub pep_status: PepStatus,
    pub sanctions_flag: bool,
    pub adverse_media_flag: bool,
    pub review_frequency_months: u32,
    pub next_review_date: NaiveDate,
}

/// Current risk picture for one customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRiskProfile {
    pub profile_id: Uuid,
    pub customer_id: String,
    pub customer_type: CustomerType,
    pub customer_name: String,
    pub customer_since: DateTime<Utc>,
    pub current_risk_level: CustomerRiskLevel,
    pub current_risk_score: f64,
    pub last_assessment_date: Option<DateTime<Utc>>,
    pub next_review_date: Option<NaiveDate>,
    pub country_of_residence: String,
    pub countries_of_operation: Vec<String>,
    pub industry: Option<String>,
    pub behavior_profile: Option<BehaviorProfile>,
    pub pep_status: PepStatus,
    pub sanctions_match: bool,
    pub adverse_media: bool,
    pub on_watchlist: bool,
    pub requires_edd: bool,
    pub edd_reason: Option<String>,
    pub open_alerts_count: u32,
    pub open_cases_count: u32,
    pub total_sars_filed: u32,
    pub assessment_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRiskProfile {
    pub fn new(customer_id: &str, customer_type: CustomerType, customer_name: &str) -> Self {
        let now = Utc::now();
        Self {
            profile_id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            customer_type,
            customer_name: customer_name.to_string(),
            customer_since: now,
            current_risk_level: CustomerRiskLevel::Medium,
            current_risk_score: 50.0,
            last_assessment_date: None,
            next_review_date: None,
            country_of_residence: "US".to_string(),
            countries_of_operation: Vec::new(),
            industry: None,
            behavior_profile: None,
            pep_status: PepStatus::NotPep,
            sanctions_match: false,
            adverse_media: false,
            on_watchlist: false,
            requires_edd: false,
            edd_reason: None,
            open_alerts_count: 0,
            open_cases_count: 0,
            total_sars_filed: 0,
            assessment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Status of a risk override request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    Pending,
    Approved,
    Rejected,
}

/// One approval on an override request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideApproval {
    pub role: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Request to administratively override a customer's risk level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskOverrideRequest {
    pub override_id: Uuid,
    pub customer_id: String,
    pub current_risk_level: CustomerRiskLevel,
    pub requested_risk_level: CustomerRiskLevel,
    pub reason: String,
    pub justification: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub requires_approval_from: Vec<String>,
    pub approvals: Vec<OverrideApproval>,
    pub status: OverrideStatus,
}

/// Category weights applied by the scorer; must sum to exactly one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub geography: f64,
    pub product: f64,
    pub channel: f64,
    pub customer: f64,
    pub transaction: f64,
    pub industry: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            geography: 0.25,
            product: 0.15,
            channel: 0.10,
            customer: 0.20,
            transaction: 0.20,
            industry: 0.10,
        }
    }
}

impl CategoryWeights {
    pub fn validate(&self) -> RiskResult<()> {
        let sum = self.geography
            + self.product
            + self.channel
            + self.customer
            + self.transaction
            + self.industry;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(RiskError::configuration(format!(
                "category weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_score() {
        assert_eq!(CustomerRiskLevel::from_score(10.0), CustomerRiskLevel::Low);
        assert_eq!(CustomerRiskLevel::from_score(45.0), CustomerRiskLevel::Medium);
        assert_eq!(CustomerRiskLevel::from_score(60.0), CustomerRiskLevel::High);
        assert_eq!(CustomerRiskLevel::from_score(85.0), CustomerRiskLevel::VeryHigh);
    }

    #[test]
    fn test_review_frequency() {
        assert_eq!(CustomerRiskLevel::Low.review_frequency_months(), 36);
        assert_eq!(CustomerRiskLevel::Medium.review_frequency_months(), 12);
        assert_eq!(CustomerRiskLevel::High.review_frequency_months(), 6);
        assert_eq!(CustomerRiskLevel::VeryHigh.review_frequency_months(), 3);
        assert_eq!(CustomerRiskLevel::Prohibited.review_frequency_months(), 0);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(CategoryWeights::default().validate().is_ok());

        let mut weights = CategoryWeights::default();
        weights.geography = 0.5;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_level_rank_ordering() {
        assert!(CustomerRiskLevel::VeryHigh.rank() > CustomerRiskLevel::Low.rank());
        assert_eq!(
            CustomerRiskLevel::VeryHigh.rank() - CustomerRiskLevel::Medium.rank(),
            2
        );
    }
}
