// =====================================================================================
// File: core-reference/src/geography.rs
// Description: Country risk reference table
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ReferenceError, ReferenceResult};

/// Risk score assigned to countries that are absent from the table
pub const UNKNOWN_COUNTRY_RISK_SCORE: f64 = 30.0;

/// Risk tier of a jurisdiction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tier from a 0-100 country risk score
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RiskTier::High
        } else if score >= 40.0 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Risk assessment for a single jurisdiction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRisk {
    pub country_code: String,
    pub country_name: String,
    pub risk_tier: RiskTier,
    /// Country risk score in [0, 100]
    pub risk_score: f64,
    pub is_sanctioned: bool,
    pub is_high_risk_jurisdiction: bool,
    pub fatf_status: Option<String>,
}

impl CountryRisk {
    pub fn new(
        code: &str,
        name: &str,
        risk_score: f64,
        is_sanctioned: bool,
        is_high_risk_jurisdiction: bool,
    ) -> Self {
        let score = risk_score.clamp(0.0, 100.0);
        Self {
            country_code: code.to_string(),
            country_name: name.to_string(),
            risk_tier: RiskTier::from_score(score),
            risk_score: score,
            is_sanctioned,
            is_high_risk_jurisdiction,
            fatf_status: None,
        }
    }
}

/// Country risk reference table, keyed by ISO 3166-1 alpha-2 code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRiskTable {
    countries: HashMap<String, CountryRisk>,
}

impl CountryRiskTable {
    pub fn empty() -> Self {
        Self {
            countries: HashMap::new(),
        }
    }

    /// Insert or replace a country entry
    pub fn upsert(&mut self, risk: CountryRisk) {
        self.countries.insert(risk.country_code.clone(), risk);
    }

    /// Look up a country, erroring when absent
    pub fn get(&self, code: &str) -> ReferenceResult<&CountryRisk> {
        self.countries
            .get(code)
            .ok_or_else(|| ReferenceError::not_found("country", code))
    }

    /// Look up a country without treating absence as an error
    pub fn find(&self, code: &str) -> Option<&CountryRisk> {
        self.countries.get(code)
    }

    /// Risk score for a country, falling back to the unknown-country default
    pub fn risk_score_or_default(&self, code: &str) -> f64 {
        self.countries
            .get(code)
            .map(|c| c.risk_score)
            .unwrap_or(UNKNOWN_COUNTRY_RISK_SCORE)
    }

    /// Whether a country is flagged as a high-risk jurisdiction
    pub fn is_high_risk(&self, code: &str) -> bool {
        self.countries
            .get(code)
            .map(|c| c.is_high_risk_jurisdiction)
            .unwrap_or(false)
    }

    /// Codes of all high-risk jurisdictions
    pub fn high_risk_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .countries
            .values()
            .filter(|c| c.is_high_risk_jurisdiction)
            .map(|c| c.country_code.clone())
            .collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

impl Default for CountryRiskTable {
    fn default() -> Self {
        let mut table = Self::empty();

        // High-risk jurisdictions
        for (code, name, score, sanctioned) in [
            ("AF", "Afghanistan", 95.0, true),
            ("IR", "Iran", 90.0, true),
            ("KP", "North Korea", 100.0, true),
            ("SY", "Syria", 90.0, true),
            ("YE", "Yemen", 85.0, false),
            ("MM", "Myanmar", 80.0, false),
            ("RU", "Russia", 70.0, true),
        ] {
            table.upsert(CountryRisk::new(code, name, score, sanctioned, true));
        }

        // Medium-risk jurisdictions
        for (code, name, score) in [
            ("PA", "Panama", 65.0),
            ("AE", "United Arab Emirates", 50.0),
            ("CN", "China", 45.0),
        ] {
            table.upsert(CountryRisk::new(code, name, score, false, false));
        }

        // Low-risk jurisdictions
        for (code, name, score) in [
            ("US", "United States", 20.0),
            ("GB", "United Kingdom", 15.0),
            ("DE", "Germany", 10.0),
            ("JP", "Japan", 10.0),
            ("CA", "Canada", 15.0),
        ] {
            table.upsert(CountryRisk::new(code, name, score, false, false));
        }

        table
    }
}
