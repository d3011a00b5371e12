// =====================================================================================
// File: service-aml/src/core.rs
// Description: AmlCore: explicit composition of the analytical subsystems
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use core_lifecycle::{
    Alert, AlertService, AlertSeverity, AlertType, CaseService, CreateAlert, SarConfig, SarService,
};
use core_monitoring::{
    BatchAnalyzer, CustomerContext, DetectedPattern, DetectorConfig, PatternDetector,
    PatternSeverity, PatternType, RuleEngine, RuleRegistry, Transaction,
};
use core_reference::{CountryRiskTable, SnapshotStore};
use core_resolution::{EntityResolver, ResolverConfig};
use core_risk::{RiskConfig, RiskScoringService};
use core_screening::{
    ScreeningConfig, ScreeningEngine, ScreeningRequest, ScreeningResult, WatchlistService,
};
use core_workflow::WorkflowService;

use crate::{
    error::{ServiceError, ServiceResult},
    hooks::{
        AuditLogger, AuditRecord, CriticalEvent, NotificationSink, TracingAuditLogger,
        TracingNotificationSink,
    },
};

/// Top-level configuration for the analytical core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmlCoreConfig {
    pub screening: ScreeningConfig,
    pub resolver: ResolverConfig,
    pub detectors: DetectorConfig,
    pub risk: RiskConfig,
    pub sar: SarConfig,
}

/// The analytical core as one owned value.
///
/// There are no process-wide singletons: construct an `AmlCore`, hand it to
/// the transport layer, and every subsystem hangs off it. Tests build
/// independent instances.
pub struct AmlCore {
    countries: Arc<SnapshotStore<CountryRiskTable>>,
    screening: Arc<ScreeningEngine>,
    watchlists: Arc<WatchlistService>,
    resolver: Arc<EntityResolver>,
    rules: Arc<RuleRegistry>,
    rule_engine: RuleEngine,
    analyzer: BatchAnalyzer,
    risk: Arc<RiskScoringService>,
    alerts: Arc<AlertService>,
    cases: Arc<CaseService>,
    sars: Arc<SarService>,
    workflows: Arc<WorkflowService>,
    audit: Arc<dyn AuditLogger>,
    notifier: Arc<dyn NotificationSink>,
    /// Downstream alert dedupe on (entity, pattern type, detection day)
    alerted_keys: Mutex<HashSet<(String, PatternType, NaiveDate)>>,
    auto_flag_threshold: f64,
    default_match_threshold: f64,
}

impl AmlCore {
    pub fn new(config: AmlCoreConfig) -> ServiceResult<Self> {
        Self::with_hooks(
            config,
            Arc::new(TracingAuditLogger),
            Arc::new(TracingNotificationSink),
        )
    }

    pub fn with_hooks(
        config: AmlCoreConfig,
        audit: Arc<dyn AuditLogger>,
        notifier: Arc<dyn NotificationSink>,
    ) -> ServiceResult<Self> {
        let countries = Arc::new(SnapshotStore::new(CountryRiskTable::default()));
        let rules = Arc::new(RuleRegistry::new());

        let auto_flag_threshold = config.screening.auto_flag_threshold;
        let default_match_threshold = config.screening.default_match_threshold;
        let screening = Arc::new(ScreeningEngine::new(config.screening)?);
        screening.load_entries(ScreeningEngine::builtin_entries());

        let detector = Arc::new(PatternDetector::new(config.detectors, rules.clone())?);

        Ok(Self {
            countries: countries.clone(),
            screening,
            watchlists: Arc::new(WatchlistService::new()),
            resolver: Arc::new(EntityResolver::new(config.resolver)?),
            rule_engine: RuleEngine::new(rules.clone()),
            analyzer: BatchAnalyzer::new(detector),
            rules,
            risk: Arc::new(RiskScoringService::new(config.risk, countries)?),
            alerts: Arc::new(AlertService::new()),
            cases: Arc::new(CaseService::new()),
            sars: Arc::new(SarService::new(config.sar)),
            workflows: Arc::new(WorkflowService::new()),
            audit,
            notifier,
            alerted_keys: Mutex::new(HashSet::new()),
            auto_flag_threshold,
            default_match_threshold,
        })
    }

    // Subsystem accessors for the command/query surface.

    pub fn countries(&self) -> &Arc<SnapshotStore<CountryRiskTable>> {
        &self.countries
    }

    pub fn screening(&self) -> &Arc<ScreeningEngine> {
        &self.screening
    }

    pub fn watchlists(&self) -> &Arc<WatchlistService> {
        &self.watchlists
    }

    pub fn resolver(&self) -> &Arc<EntityResolver> {
        &self.resolver
    }

    pub fn rules(&self) -> &Arc<RuleRegistry> {
        &self.rules
    }

    pub fn rule_engine(&self) -> &RuleEngine {
        &self.rule_engine
    }

    pub fn analyzer(&self) -> &BatchAnalyzer {
        &self.analyzer
    }

    pub fn risk(&self) -> &Arc<RiskScoringService> {
        &self.risk
    }

    pub fn alerts(&self) -> &Arc<AlertService> {
        &self.alerts
    }

    pub fn cases(&self) -> &Arc<CaseService> {
        &self.cases
    }

    pub fn sars(&self) -> &Arc<SarService> {
        &self.sars
    }

    pub fn workflows(&self) -> &Arc<WorkflowService> {
        &self.workflows
    }

    /// Evaluate one transaction and materialize alerts for fresh patterns.
    ///
    /// Patterns are returned verbatim; alert creation dedupes on
    /// (primary entity, pattern type, detection day) so repeated hits on
    /// the same phenomenon collapse into one alert per day.
    pub async fn monitor_transaction(
        &self,
        tx: &Transaction,
        ctx: &CustomerContext,
    ) -> ServiceResult<(Vec<DetectedPattern>, Vec<Alert>)> {
        let patterns = self.rule_engine.evaluate(tx, ctx);
        let alerts = self.raise_alerts_for_patterns(&patterns).await?;
        Ok((patterns, alerts))
    }

    /// Create deduplicated alerts for a batch of detected patterns
    pub async fn raise_alerts_for_patterns(
        &self,
        patterns: &[DetectedPattern],
    ) -> ServiceResult<Vec<Alert>> {
        let mut created = Vec::new();
        for pattern in patterns {
            let key = (
                pattern.primary_entity_id.clone(),
                pattern.pattern_type,
                pattern.detected_at.date_naive(),
            );
            {
                let mut seen = self.alerted_keys.lock().await;
                if !seen.insert(key) {
                    continue;
                }
            }

            let severity = severity_for(pattern.severity);
            let mut request = CreateAlert::new(
                alert_type_for(pattern.pattern_type),
                severity,
                &format!("{} detected", pattern.rule_name),
                &pattern.primary_entity_id,
            );
            request.description = format!(
                "Rule {} v{} flagged {} transaction(s)",
                pattern.rule_name, pattern.rule_version, pattern.transaction_count
            );
            request.risk_score = (pattern.confidence_score * 100.0).clamp(0.0, 100.0);
            request.transaction_ids = pattern.transaction_ids.clone();
            request.pattern_ids = vec![pattern.pattern_id];
            request.total_amount = Some(pattern.total_amount);
            request.currency = Some(pattern.currency.clone());

            let alert = self.alerts.create_alert(request).await?;
            self.audit
                .record(AuditRecord::new("system", "create_alert", &alert.alert_number))
                .await;
            if severity == AlertSeverity::Critical {
                self.notifier
                    .notify(CriticalEvent::new(
                        "critical_alert",
                        &pattern.primary_entity_id,
                        &alert.title,
                    ))
                    .await;
            }
            created.push(alert);
        }
        Ok(created)
    }

    /// Screen a customer against the sanctions lists and react to the
    /// verdict: a hit at or above the auto-flag threshold flips the
    /// customer's sanctions flag and raises a high-severity alert; weaker
    /// retained matches raise a review alert.
    pub async fn screen_customer(
        &self,
        request: ScreeningRequest,
    ) -> ServiceResult<(ScreeningResult, Option<Alert>)> {
        let subject_id = request
            .entity_id
            .clone()
            .unwrap_or_else(|| request.entity_name.clone());
        let result = self.screening.screen(request).await?;

        let alert = if result.requires_sanctions_flag(self.auto_flag_threshold) {
            if self.risk.get_risk_profile(&subject_id).await.is_some() {
                self.risk
                    .update_profile(&subject_id, |profile| profile.sanctions_match = true)
                    .await?;
            }
            self.notifier
                .notify(CriticalEvent::new(
                    "sanctions_hit",
                    &subject_id,
                    &format!(
                        "{} matched a sanctions list at {:.2}",
                        result.entity_name, result.highest_match_score
                    ),
                ))
                .await;

            let mut create = CreateAlert::new(
                AlertType::SanctionsMatch,
                AlertSeverity::High,
                &format!("Sanctions list match for {}", result.entity_name),
                &subject_id,
            );
            create.risk_score = (result.highest_match_score * 100.0).clamp(0.0, 100.0);
            Some(self.alerts.create_alert(create).await?)
        } else if result.has_matches {
            let mut create = CreateAlert::new(
                AlertType::SanctionsMatch,
                AlertSeverity::Medium,
                &format!("Potential sanctions match for {}", result.entity_name),
                &subject_id,
            );
            create.risk_score = (result.highest_match_score * 100.0).clamp(0.0, 100.0);
            Some(self.alerts.create_alert(create).await?)
        } else {
            None
        };

        if let Some(alert) = &alert {
            self.audit
                .record(AuditRecord::new("system", "screen_customer", &alert.alert_number))
                .await;
        }
        Ok((result, alert))
    }

    pub fn default_match_threshold(&self) -> f64 {
        self.default_match_threshold
    }

    /// File an approved SAR and synchronize the linked lifecycle objects:
    /// alerts move to sar_filed and cases record the SAR reference.
    pub async fn file_sar(
        &self,
        sar_id: Uuid,
        method: &str,
        filed_by: &str,
    ) -> ServiceResult<core_lifecycle::Sar> {
        let sar = self.sars.file_sar(sar_id, method).await?;

        for alert_id in &sar.alert_ids {
            if self.alerts.mark_sar_filed(*alert_id).await.is_err() {
                info!(alert = %alert_id, "linked alert not in a filable state");
            }
        }
        for case_id in &sar.case_ids {
            self.cases.link_sar(*case_id, sar.sar_id).await.ok();
        }

        self.audit
            .record(AuditRecord::new(filed_by, "file_sar", &sar.sar_number))
            .await;
        Ok(sar)
    }

    /// Count an open alert against the customer's risk profile if one
    /// exists
    pub async fn record_alert_opened(&self, customer_id: &str) -> ServiceResult<()> {
        if self.risk.get_risk_profile(customer_id).await.is_some() {
            self.risk
                .update_profile(customer_id, |profile| profile.open_alerts_count += 1)
                .await?;
        }
        Ok(())
    }
}

fn severity_for(severity: PatternSeverity) -> AlertSeverity {
    match severity {
        PatternSeverity::Informational | PatternSeverity::Low => AlertSeverity::Low,
        PatternSeverity::Medium => AlertSeverity::Medium,
        PatternSeverity::High => AlertSeverity::High,
        PatternSeverity::Critical => AlertSeverity::Critical,
    }
}

fn alert_type_for(pattern_type: PatternType) -> AlertType {
    match pattern_type {
        PatternType::Structuring => AlertType::Structuring,
        PatternType::Layering => AlertType::Layering,
        PatternType::RoundTripping => AlertType::RoundTripping,
        PatternType::RapidMovement => AlertType::RapidMovement,
        PatternType::VelocitySpike => AlertType::VelocitySpike,
        PatternType::GeographicAnomaly => AlertType::GeographicAnomaly,
        PatternType::DormantActivation => AlertType::DormantActivation,
        PatternType::AmountAnomaly => AlertType::AmountAnomaly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::RecordingHooks;
    use chrono::Utc;
    use core_monitoring::{TransactionChannel, TransactionDirection};
    use core_screening::ScreenedEntityType;
    use rust_decimal_macros::dec;

    fn transaction(amount: rust_decimal::Decimal) -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            customer_id: "C1".to_string(),
            account_id: "A1".to_string(),
            direction: TransactionDirection::Credit,
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

    #[tokio::test]
    async fn test_monitor_transaction_raises_alert_once_per_day() {
        let core = AmlCore::new(AmlCoreConfig::default()).unwrap();
        let ctx = CustomerContext::new("C1", "Jane Roe");

        let (patterns, alerts) = core
            .monitor_transaction(&transaction(dec!(15000)), &ctx)
            .await
            .unwrap();
        assert!(!patterns.is_empty());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::AmountAnomaly);

        // Same phenomenon on the same day is deduplicated.
        let (_, again) = core
            .monitor_transaction(&transaction(dec!(16000)), &ctx)
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_screen_customer_flags_and_notifies() {
        let hooks = Arc::new(RecordingHooks::default());
        let core = AmlCore::with_hooks(
            AmlCoreConfig::default(),
            hooks.clone(),
            hooks.clone(),
        )
        .unwrap();

        core.risk()
            .create_risk_profile(core_risk::CustomerRiskProfile::new(
                "C1",
                core_risk::CustomerType::Individual,
                "John Smith Doe",
            ))
            .await
            .unwrap();

        let mut request =
            ScreeningRequest::new(ScreenedEntityType::Individual, "John Smith Doe", "analyst1");
        request.entity_id = Some("C1".to_string());
        request.date_of_birth = chrono::NaiveDate::from_ymd_opt(1975, 3, 14);
        request.nationalities = vec!["US".to_string()];

        let (result, alert) = core.screen_customer(request).await.unwrap();
        assert!(result.has_matches);
        let alert = alert.expect("sanctions alert");
        assert_eq!(alert.severity, AlertSeverity::High);

        let profile = core.risk().get_risk_profile("C1").await.unwrap();
        assert!(profile.sanctions_match);
        assert!(!hooks.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_clean_screening_raises_nothing() {
        let core = AmlCore::new(AmlCoreConfig::default()).unwrap();
        let request = ScreeningRequest::new(
            ScreenedEntityType::Individual,
            "Totally Unremarkable Person",
            "analyst1",
        );
        let (result, alert) = core.screen_customer(request).await.unwrap();
        assert!(!result.has_matches);
        assert!(alert.is_none());
    }
}
