// =====================================================================================
// File: core-risk/src/scoring.rs
// Description: Category risk score computations
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};

use core_reference::CountryRiskTable;

use crate::types::{
    CustomerRiskProfile, CustomerType, PepStatus, RiskFactor, RiskFactorCategory,
};

/// Product, channel, and industry risk catalogs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCatalogs {
    pub high_risk_products: Vec<String>,
    pub medium_risk_products: Vec<String>,
    pub high_risk_channels: Vec<String>,
    pub medium_risk_channels: Vec<String>,
    pub high_risk_industries: Vec<String>,
    pub medium_risk_industries: Vec<String>,
}

impl Default for RiskCatalogs {
    fn default() -> Self {
        Self {
            high_risk_products: vec![
                "wire_transfer".to_string(),
                "correspondent_banking".to_string(),
                "trade_finance".to_string(),
            ],
            medium_risk_products: vec![
                "investment".to_string(),
                "foreign_exchange".to_string(),
                "credit_card".to_string(),
            ],
            high_risk_channels: vec![
                "non_face_to_face".to_string(),
                "third_party".to_string(),
                "agent".to_string(),
            ],
            medium_risk_channels: vec!["online".to_string(), "mobile".to_string()],
            high_risk_industries: vec![
                "casino".to_string(),
                "gambling".to_string(),
                "money_service_business".to_string(),
                "crypto".to_string(),
                "precious_metals".to_string(),
                "arms_dealer".to_string(),
            ],
            medium_risk_industries: vec![
                "real_estate".to_string(),
                "legal_services".to_string(),
                "accounting".to_string(),
                "art_dealer".to_string(),
            ],
        }
    }
}

/// Geography: residence country score, raised by countries of operation at
/// eighty percent weight
pub fn geography_risk(profile: &CustomerRiskProfile, countries: &CountryRiskTable) -> f64 {
    let mut score = countries.risk_score_or_default(&profile.country_of_residence);
    for country in &profile.countries_of_operation {
        let country_score = countries.risk_score_or_default(country);
        score = score.max(country_score * 0.8);
    }
    score.min(100.0)
}

/// Customer inherent risk: PEP, sanctions, adverse media, and legal form
pub fn customer_inherent_risk(profile: &CustomerRiskProfile) -> f64 {
    let mut score: f64 = 20.0;
    match profile.pep_status {
        PepStatus::Pep => score += 40.0,
        PepStatus::PepFamily | PepStatus::PepAssociate => score += 25.0,
        PepStatus::NotPep => {}
    }
    if profile.sanctions_match {
        score += 50.0;
    }
    if profile.adverse_media {
        score += 20.0;
    }
    if matches!(
        profile.customer_type,
        CustomerType::Trust | CustomerType::FinancialInstitution
    ) {
        score += 15.0;
    }
    score.min(100.0)
}

/// Transaction behaviour risk: velocity, consistency, exposure, and open
/// investigation load
pub fn transaction_risk(profile: &CustomerRiskProfile) -> f64 {
    let mut score: f64 = 20.0;
    if let Some(behavior) = &profile.behavior_profile {
        if behavior.velocity_score > 70.0 {
            score += 20.0;
        }
        if behavior.consistency_score < 30.0 {
            score += 15.0;
        }
        if behavior.high_risk_country_exposure > 0.2 {
            score += 25.0;
        }
    }
    score += profile.open_alerts_count as f64 * 5.0;
    score += profile.open_cases_count as f64 * 10.0;
    score += profile.total_sars_filed as f64 * 15.0;
    score.min(100.0)
}

/// Product risk from the usage catalog
pub fn product_risk(profile: &CustomerRiskProfile, catalogs: &RiskCatalogs) -> f64 {
    let mut score: f64 = 20.0;
    if let Some(behavior) = &profile.behavior_profile {
        for product in &behavior.product_types_used {
            if catalogs.high_risk_products.contains(product) {
                score = score.max(70.0);
            } else if catalogs.medium_risk_products.contains(product) {
                score = score.max(45.0);
            }
        }
    }
    score
}

/// Channel risk from the delivery-channel catalog
pub fn channel_risk(profile: &CustomerRiskProfile, catalogs: &RiskCatalogs) -> f64 {
    let mut score: f64 = 20.0;
    if let Some(behavior) = &profile.behavior_profile {
        for channel in &behavior.primary_channels {
            if catalogs.high_risk_channels.contains(channel) {
                score = score.max(65.0);
            } else if catalogs.medium_risk_channels.contains(channel) {
                score = score.max(40.0);
            }
        }
    }
    score
}

/// Industry risk from the industry catalog
pub fn industry_risk(profile: &CustomerRiskProfile, catalogs: &RiskCatalogs) -> f64 {
    match &profile.industry {
        Some(industry) if catalogs.high_risk_industries.contains(industry) => 80.0,
        Some(industry) if catalogs.medium_risk_industries.contains(industry) => 50.0,
        _ => 25.0,
    }
}

/// Active risk factors worth surfacing on the assessment
pub fn identify_risk_factors(
    profile: &CustomerRiskProfile,
    countries: &CountryRiskTable,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    if profile.pep_status != PepStatus::NotPep {
        factors.push(RiskFactor::new(
            RiskFactorCategory::Customer,
            "PEP_STATUS",
            "Politically Exposed Person",
            &format!("Customer has PEP status: {:?}", profile.pep_status),
            2.0,
            40.0,
        ));
    }
    if profile.sanctions_match {
        factors.push(RiskFactor::new(
            RiskFactorCategory::Customer,
            "SANCTIONS_MATCH",
            "Sanctions List Match",
            "Customer matches a sanctions list entry",
            3.0,
            50.0,
        ));
    }
    if let Some(country) = countries.find(&profile.country_of_residence) {
        if country.is_high_risk_jurisdiction {
            factors.push(RiskFactor::new(
                RiskFactorCategory::Geography,
                "HIGH_RISK_COUNTRY",
                "High-Risk Country",
                &format!(
                    "Customer resides in high-risk jurisdiction: {}",
                    country.country_name
                ),
                1.5,
                country.risk_score,
            ));
        }
    }
    if profile.total_sars_filed > 0 {
        factors.push(RiskFactor::new(
            RiskFactorCategory::Transaction,
            "PRIOR_SAR",
            "Prior SAR Filing",
            &format!("{} previous SAR(s) filed", profile.total_sars_filed),
            2.0,
            (30.0 * profile.total_sars_filed as f64).min(100.0),
        ));
    }

    factors
}
