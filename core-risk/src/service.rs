// =====================================================================================
// File: core-risk/src/service.rs
// Description: Customer risk scoring service
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Months, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use core_reference::{CountryRiskTable, SnapshotStore};

use crate::{
    error::{RiskError, RiskResult},
    scoring::{self, RiskCatalogs},
    types::{
        AssessmentTrigger, CategoryWeights, CustomerRiskAssessment, CustomerRiskLevel,
        CustomerRiskProfile, CustomerType, OverrideApproval, OverrideStatus, RiskOverrideRequest,
    },
};

/// Risk scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub weights: CategoryWeights,
    pub catalogs: RiskCatalogs,
    /// Roles that must approve a risk override
    pub override_approver_roles: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            catalogs: RiskCatalogs::default(),
            override_approver_roles: vec!["compliance_officer".to_string()],
        }
    }
}

/// Customer risk scoring and profile management.
///
/// The country table is shared platform reference data published as
/// copy-on-write snapshots; per-customer profiles live behind the service
/// store lock.
pub struct RiskScoringService {
    config: RiskConfig,
    countries: Arc<SnapshotStore<CountryRiskTable>>,
    profiles: RwLock<HashMap<String, CustomerRiskProfile>>,
    assessments: RwLock<HashMap<Uuid, CustomerRiskAssessment>>,
    overrides: RwLock<HashMap<Uuid, RiskOverrideRequest>>,
}

impl RiskScoringService {
    pub fn new(
        config: RiskConfig,
        countries: Arc<SnapshotStore<CountryRiskTable>>,
    ) -> RiskResult<Self> {
        config.weights.validate()?;
        if config.override_approver_roles.is_empty() {
            return Err(RiskError::configuration(
                "override_approver_roles must not be empty",
            ));
        }
        Ok(Self {
            config,
            countries,
            profiles: RwLock::new(HashMap::new()),
            assessments: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Create a profile for a new customer
    pub async fn create_risk_profile(
        &self,
        profile: CustomerRiskProfile,
    ) -> RiskResult<CustomerRiskProfile> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.customer_id) {
            return Err(RiskError::conflict(format!(
                "risk profile already exists for customer {}",
                profile.customer_id
            )));
        }
        profiles.insert(profile.customer_id.clone(), profile.clone());
        info!(customer = %profile.customer_id, "risk profile created");
        Ok(profile)
    }

    pub async fn get_risk_profile(&self, customer_id: &str) -> Option<CustomerRiskProfile> {
        self.profiles.read().await.get(customer_id).cloned()
    }

    /// Apply a mutation to a profile under the store lock
    pub async fn update_profile<F>(
        &self,
        customer_id: &str,
        mutate: F,
    ) -> RiskResult<CustomerRiskProfile>
    where
        F: FnOnce(&mut CustomerRiskProfile),
    {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(customer_id).ok_or_else(|| {
            RiskError::not_found("risk profile".to_string(), customer_id.to_string())
        })?;
        mutate(profile);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    /// Run a full risk assessment and fold the result into the profile.
    ///
    /// An administratively prohibited customer keeps that level regardless
    /// of the computed score.
    pub async fn assess_customer_risk(
        &self,
        customer_id: &str,
        trigger: AssessmentTrigger,
    ) -> RiskResult<CustomerRiskAssessment> {
        let profile = self
            .get_risk_profile(customer_id)
            .await
            .ok_or_else(|| {
                RiskError::not_found("risk profile".to_string(), customer_id.to_string())
            })?;

        let countries = self.countries.load();
        let weights = &self.config.weights;
        let catalogs = &self.config.catalogs;

        let geography = scoring::geography_risk(&profile, &countries);
        let product = scoring::product_risk(&profile, catalogs);
        let channel = scoring::channel_risk(&profile, catalogs);
        let customer = scoring::customer_inherent_risk(&profile);
        let transaction = scoring::transaction_risk(&profile);
        let industry = scoring::industry_risk(&profile, catalogs);

        let overall = (geography * weights.geography
            + product * weights.product
            + channel * weights.channel
            + customer * weights.customer
            + transaction * weights.transaction
            + industry * weights.industry)
            .clamp(0.0, 100.0);

        let risk_level = CustomerRiskLevel::from_score(overall);
        let review_months = risk_level.review_frequency_months();
        let next_review = Utc::now()
            .date_naive()
            .checked_add_months(Months::new(review_months))
            .unwrap_or_else(|| Utc::now().date_naive());

        let assessment = CustomerRiskAssessment {
            assessment_id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            assessment_date: Utc::now(),
            trigger,
            risk_level,
            overall_risk_score: overall,
            geography_risk_score: geography,
            product_risk_score: product,
            channel_risk_score: channel,
            customer_risk_score: customer,
            transaction_risk_score: transaction,
            industry_risk_score: industry,
            risk_factors: scoring::identify_risk_factors(&profile, &countries),
            pep_status: profile.pep_status,
            sanctions_flag: profile.sanctions_match,
            adverse_media_flag: profile.adverse_media,
            review_frequency_months: review_months,
            next_review_date: next_review,
        };

        self.assessments
            .write()
            .await
            .insert(assessment.assessment_id, assessment.clone());

        self.update_profile(customer_id, |profile| {
            profile.current_risk_score = assessment.overall_risk_score;
            if profile.current_risk_level != CustomerRiskLevel::Prohibited {
                profile.current_risk_level = assessment.risk_level;
            }
            profile.last_assessment_date = Some(assessment.assessment_date);
            profile.next_review_date = Some(assessment.next_review_date);
            profile.assessment_ids.push(assessment.assessment_id);
        })
        .await?;

        debug!(
            customer = %customer_id,
            score = assessment.overall_risk_score,
            level = ?assessment.risk_level,
            "customer risk assessed"
        );
        Ok(assessment)
    }

    pub async fn get_assessment(&self, assessment_id: Uuid) -> Option<CustomerRiskAssessment> {
        self.assessments.read().await.get(&assessment_id).cloned()
    }

    /// File a request to override a customer's risk level
    pub async fn request_risk_override(
        &self,
        customer_id: &str,
        requested_level: CustomerRiskLevel,
        reason: &str,
        justification: &str,
        requested_by: &str,
    ) -> RiskResult<RiskOverrideRequest> {
        let profile = self
            .get_risk_profile(customer_id)
            .await
            .ok_or_else(|| {
                RiskError::not_found("risk profile".to_string(), customer_id.to_string())
            })?;

        let mut overrides = self.overrides.write().await;
        if overrides
            .values()
            .any(|o| o.customer_id == customer_id && o.status == OverrideStatus::Pending)
        {
            return Err(RiskError::invalid(format!(
                "customer {customer_id} already has a pending override"
            )));
        }
        if profile.current_risk_level == requested_level {
            return Err(RiskError::invalid(
                "requested level equals the current level",
            ));
        }

        let request = RiskOverrideRequest {
            override_id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            current_risk_level: profile.current_risk_level,
            requested_risk_level: requested_level,
            reason: reason.to_string(),
            justification: justification.to_string(),
            requested_by: requested_by.to_string(),
            requested_at: Utc::now(),
            requires_approval_from: self.config.override_approver_roles.clone(),
            approvals: Vec::new(),
            status: OverrideStatus::Pending,
        };
        overrides.insert(request.override_id, request.clone());
        info!(customer = %customer_id, requested = ?requested_level, "risk override requested");
        Ok(request)
    }

    /// Record one role's approval; the final approval applies the override
    pub async fn approve_override(
        &self,
        override_id: Uuid,
        role: &str,
        approved_by: &str,
        notes: Option<String>,
    ) -> RiskResult<RiskOverrideRequest> {
        let request = {
            let mut overrides = self.overrides.write().await;
            let request = overrides.get_mut(&override_id).ok_or_else(|| {
                RiskError::not_found("override request".to_string(), override_id.to_string())
            })?;
            if request.status != OverrideStatus::Pending {
                return Err(RiskError::invalid("override is not pending"));
            }
            if !request.requires_approval_from.iter().any(|r| r == role) {
                return Err(RiskError::invalid(format!(
                    "role {role} is not a required approver"
                )));
            }
            if request.approvals.iter().any(|a| a.role == role) {
                return Err(RiskError::invalid(format!("role {role} already approved")));
            }

            request.approvals.push(OverrideApproval {
                role: role.to_string(),
                approved_by: approved_by.to_string(),
                approved_at: Utc::now(),
                notes,
            });

            let approved_roles: Vec<&str> =
                request.approvals.iter().map(|a| a.role.as_str()).collect();
            let fully_approved = request
                .requires_approval_from
                .iter()
                .all(|r| approved_roles.contains(&r.as_str()));
            if fully_approved {
                request.status = OverrideStatus::Approved;
            }
            request.clone()
        };

        if request.status == OverrideStatus::Approved {
            let upward_by = request
                .requested_risk_level
                .rank()
                .saturating_sub(request.current_risk_level.rank());
            self.update_profile(&request.customer_id, |profile| {
                profile.current_risk_level = request.requested_risk_level;
                if upward_by >= 2 {
                    profile.requires_edd = true;
                    profile.edd_reason =
                        Some("risk level raised by override".to_string());
                }
            })
            .await?;
            info!(
                customer = %request.customer_id,
                level = ?request.requested_risk_level,
                "risk override applied"
            );
        }
        Ok(request)
    }

    /// Reject a pending override
    pub async fn reject_override(
        &self,
        override_id: Uuid,
        _rejected_by: &str,
    ) -> RiskResult<RiskOverrideRequest> {
        let mut overrides = self.overrides.write().await;
        let request = overrides.get_mut(&override_id).ok_or_else(|| {
            RiskError::not_found("override request".to_string(), override_id.to_string())
        })?;
        if request.status != OverrideStatus::Pending {
            return Err(RiskError::invalid("override is not pending"));
        }
        request.status = OverrideStatus::Rejected;
        Ok(request.clone())
    }

    /// Profiles due for periodic review on or before the given date
    pub async fn profiles_due_for_review(
        &self,
        as_of: chrono::NaiveDate,
    ) -> Vec<CustomerRiskProfile> {
        self.profiles
            .read()
            .await
            .values()
            .filter(|p| p.next_review_date.map(|d| d <= as_of).unwrap_or(false))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PepStatus;

    fn service() -> RiskScoringService {
        RiskScoringService::new(
            RiskConfig::default(),
            Arc::new(SnapshotStore::new(CountryRiskTable::default())),
        )
        .unwrap()
    }

    async fn seeded(service: &RiskScoringService, customer_id: &str) -> CustomerRiskProfile {
        service
            .create_risk_profile(CustomerRiskProfile::new(
                customer_id,
                CustomerType::Individual,
                "Jane Roe",
            ))
            .await
            .unwrap()
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut config = RiskConfig::default();
        config.weights.industry = 0.5;
        let countries = Arc::new(SnapshotStore::new(CountryRiskTable::default()));
        assert!(RiskScoringService::new(config, countries).is_err());
    }

    #[tokio::test]
    async fn test_assessment_low_risk_customer() {
        let service = service();
        seeded(&service, "C1").await;

        let assessment = service
            .assess_customer_risk("C1", AssessmentTrigger::Onboarding)
            .await
            .unwrap();
        assert_eq!(assessment.risk_level, CustomerRiskLevel::Low);
        assert!(assessment.overall_risk_score < 40.0);
        assert_eq!(assessment.review_frequency_months, 36);

        let profile = service.get_risk_profile("C1").await.unwrap();
        assert_eq!(profile.current_risk_level, CustomerRiskLevel::Low);
        assert!(profile.next_review_date.is_some());
        assert_eq!(profile.assessment_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_sanctions_and_pep_raise_level() {
        let service = service();
        seeded(&service, "C1").await;
        service
            .update_profile("C1", |p| {
                p.pep_status = PepStatus::Pep;
                p.sanctions_match = true;
                p.country_of_residence = "IR".to_string();
                p.open_cases_count = 2;
                p.total_sars_filed = 2;
            })
            .await
            .unwrap();

        let assessment = service
            .assess_customer_risk("C1", AssessmentTrigger::EventTriggered)
            .await
            .unwrap();
        // geography 90*0.25 + customer 100*0.20 + transaction 70*0.20 plus
        // the table-driven categories lands above the high band.
        assert!(assessment.overall_risk_score >= 60.0);
        assert!(matches!(
            assessment.risk_level,
            CustomerRiskLevel::High | CustomerRiskLevel::VeryHigh
        ));
        assert!(!assessment.risk_factors.is_empty());
    }

    #[tokio::test]
    async fn test_adding_risk_factor_never_decreases_score() {
        let service = service();
        seeded(&service, "C1").await;
        let before = service
            .assess_customer_risk("C1", AssessmentTrigger::Periodic)
            .await
            .unwrap();

        service
            .update_profile("C1", |p| p.open_alerts_count += 1)
            .await
            .unwrap();
        let after = service
            .assess_customer_risk("C1", AssessmentTrigger::Periodic)
            .await
            .unwrap();
        assert!(after.overall_risk_score >= before.overall_risk_score);
    }

    #[tokio::test]
    async fn test_prohibited_level_survives_assessment() {
        let service = service();
        seeded(&service, "C1").await;
        service
            .update_profile("C1", |p| {
                p.current_risk_level = CustomerRiskLevel::Prohibited
            })
            .await
            .unwrap();

        service
            .assess_customer_risk("C1", AssessmentTrigger::Periodic)
            .await
            .unwrap();
        let profile = service.get_risk_profile("C1").await.unwrap();
        assert_eq!(profile.current_risk_level, CustomerRiskLevel::Prohibited);
    }

    #[tokio::test]
    async fn test_override_flow_applies_on_final_approval() {
        let service = service();
        seeded(&service, "C1").await;
        service
            .assess_customer_risk("C1", AssessmentTrigger::Onboarding)
            .await
            .unwrap();

        let request = service
            .request_risk_override(
                "C1",
                CustomerRiskLevel::VeryHigh,
                "law enforcement inquiry",
                "subpoena received",
                "analyst1",
            )
            .await
            .unwrap();
        assert_eq!(request.status, OverrideStatus::Pending);

        let approved = service
            .approve_override(
                request.override_id,
                "compliance_officer",
                "officer1",
                None,
            )
            .await
            .unwrap();
        assert_eq!(approved.status, OverrideStatus::Approved);

        let profile = service.get_risk_profile("C1").await.unwrap();
        assert_eq!(profile.current_risk_level, CustomerRiskLevel::VeryHigh);
        // Low -> VeryHigh is a three-level move; EDD kicks in.
        assert!(profile.requires_edd);
    }

    #[tokio::test]
    async fn test_overlapping_override_rejected() {
        let service = service();
        seeded(&service, "C1").await;
        service
            .request_risk_override("C1", CustomerRiskLevel::High, "r", "j", "analyst1")
            .await
            .unwrap();
        let err = service
            .request_risk_override("C1", CustomerRiskLevel::Low, "r", "j", "analyst1")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "invalid");
    }

    #[tokio::test]
    async fn test_approval_role_checks() {
        let service = service();
        seeded(&service, "C1").await;
        let request = service
            .request_risk_override("C1", CustomerRiskLevel::High, "r", "j", "analyst1")
            .await
            .unwrap();

        let err = service
            .approve_override(request.override_id, "janitor", "j1", None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "invalid");
    }

    #[tokio::test]
    async fn test_reject_override() {
        let service = service();
        seeded(&service, "C1").await;
        let request = service
            .request_risk_override("C1", CustomerRiskLevel::High, "r", "j", "analyst1")
            .await
            .unwrap();
        let rejected = service
            .reject_override(request.override_id, "officer1")
            .await
            .unwrap();
        assert_eq!(rejected.status, OverrideStatus::Rejected);

        let profile = service.get_risk_profile("C1").await.unwrap();
        assert_ne!(profile.current_risk_level, CustomerRiskLevel::High);
    }

    #[tokio::test]
    async fn test_profiles_due_for_review() {
        let service = service();
        seeded(&service, "C1").await;
        service
            .assess_customer_risk("C1", AssessmentTrigger::Onboarding)
            .await
            .unwrap();

        let far_future = Utc::now().date_naive() + chrono::Duration::days(365 * 4);
        assert_eq!(service.profiles_due_for_review(far_future).await.len(), 1);
        assert!(service
            .profiles_due_for_review(Utc::now().date_naive())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_profile_conflicts() {
        let service = service();
        seeded(&service, "C1").await;
        let err = service
            .create_risk_profile(CustomerRiskProfile::new(
                "C1",
                CustomerType::Individual,
                "Jane Roe",
            ))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "conflict");
    }
}
