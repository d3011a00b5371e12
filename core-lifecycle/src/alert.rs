// =====================================================================================
// File: core-lifecycle/src/alert.rs
// Description: AML alert lifecycle management
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{LifecycleError, LifecycleResult},
    numbering::DailySequence,
};

/// Alert severity; drives the SLA due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Working-days SLA: LOW 30, MEDIUM 14, HIGH 7, CRITICAL 3
    pub fn sla_days(&self) -> i64 {
        match self {
            AlertSeverity::Low => 30,
            AlertSeverity::Medium => 14,
            AlertSeverity::High => 7,
            AlertSeverity::Critical => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// What kind of detection raised the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Structuring,
    Layering,
    RoundTripping,
    RapidMovement,
    VelocitySpike,
    GeographicAnomaly,
    DormantActivation,
    AmountAnomaly,
    SanctionsMatch,
    WatchlistMatch,
    ManualReview,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Structuring => "structuring",
            AlertType::Layering => "layering",
            AlertType::RoundTripping => "round_tripping",
            AlertType::RapidMovement => "rapid_movement",
            AlertType::VelocitySpike => "velocity_spike",
            AlertType::GeographicAnomaly => "geographic_anomaly",
            AlertType::DormantActivation => "dormant_activation",
            AlertType::AmountAnomaly => "amount_anomaly",
            AlertType::SanctionsMatch => "sanctions_match",
            AlertType::WatchlistMatch => "watchlist_match",
            AlertType::ManualReview => "manual_review",
        }
    }
}

/// Alert workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Assigned,
    UnderReview,
    Escalated,
    ClosedFalsePositive,
    ClosedTruePositive,
    SarFiled,
}

impl AlertStatus {
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            AlertStatus::ClosedFalsePositive | AlertStatus::ClosedTruePositive | AlertStatus::SarFiled
        )
    }

    /// Legal transitions; the only back-edge is reassignment out of review
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, next),
            (New, Assigned)
                | (Assigned, UnderReview)
                | (UnderReview, Assigned)
                | (UnderReview, Escalated)
                | (UnderReview, ClosedFalsePositive)
                | (UnderReview, ClosedTruePositive)
                | (Escalated, ClosedFalsePositive)
                | (Escalated, ClosedTruePositive)
                | (ClosedTruePositive, SarFiled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Assigned => "assigned",
            AlertStatus::UnderReview => "under_review",
            AlertStatus::Escalated => "escalated",
            AlertStatus::ClosedFalsePositive => "closed_false_positive",
            AlertStatus::ClosedTruePositive => "closed_true_positive",
            AlertStatus::SarFiled => "sar_filed",
        }
    }
}

/// One assignment on an alert; history is append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertAssignment {
    pub assigned_to: String,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Analyst comment; the log is append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertComment {
    pub comment_id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// Evidence reference; the document itself lives in the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvidence {
    pub evidence_id: Uuid,
    pub evidence_type: String,
    pub description: String,
    pub document_path: Option<String>,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

/// An AML alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    /// Public number, `ALT-YYYYMMDD-NNNNNN`
    pub alert_number: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub title: String,
    pub description: String,
    pub customer_id: String,
    pub account_ids: Vec<String>,
    /// Risk score in [0, 100]
    pub risk_score: f64,
    pub transaction_ids: Vec<Uuid>,
    pub pattern_ids: Vec<Uuid>,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub current_assignee: Option<String>,
    pub assignments: Vec<AlertAssignment>,
    pub comments: Vec<AlertComment>,
    pub evidence: Vec<AlertEvidence>,
    pub case_id: Option<Uuid>,
    pub sar_required: bool,
    pub tags: Vec<String>,
    /// Optimistic-concurrency version, bumped on every mutation
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_closed() && self.due_date < now
    }
}

/// Request to create an alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub customer_id: String,
    pub account_ids: Vec<String>,
    pub risk_score: f64,
    pub transaction_ids: Vec<Uuid>,
    pub pattern_ids: Vec<Uuid>,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub tags: Vec<String>,
}

impl CreateAlert {
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        title: &str,
        customer_id: &str,
    ) -> Self {
        Self {
            alert_type,
            severity,
            title: title.to_string(),
            description: String::new(),
            customer_id: customer_id.to_string(),
            account_ids: Vec::new(),
            risk_score: 0.0,
            transaction_ids: Vec::new(),
            pattern_ids: Vec::new(),
            total_amount: None,
            currency: None,
            tags: Vec::new(),
        }
    }
}

/// Partial update to an alert; `expected_version` enables optimistic locking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAlert {
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sar_required: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub expected_version: Option<u64>,
}

/// Sortable fields for alert search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSortField {
    CreatedAt,
    DueDate,
    RiskScore,
    Severity,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search criteria with pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSearchCriteria {
    pub alert_types: Option<Vec<AlertType>>,
    pub severities: Option<Vec<AlertSeverity>>,
    pub statuses: Option<Vec<AlertStatus>>,
    pub customer_ids: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub min_risk_score: Option<f64>,
    pub max_risk_score: Option<f64>,
    pub overdue_only: bool,
    pub unassigned_only: bool,
    pub page: usize,
    pub page_size: usize,
    pub sort_by: AlertSortField,
    pub sort_order: SortOrder,
}

impl Default for AlertSearchCriteria {
    fn default() -> Self {
        Self {
            alert_types: None,
            severities: None,
            statuses: None,
            customer_ids: None,
            assignees: None,
            date_from: None,
            date_to: None,
            min_risk_score: None,
            max_risk_score: None,
            overdue_only: false,
            unassigned_only: false,
            page: 1,
            page_size: 50,
            sort_by: AlertSortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Listing row for search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummary {
    pub alert_id: Uuid,
    pub alert_number: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub customer_id: String,
    pub risk_score: f64,
    pub current_assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPage {
    pub items: Vec<AlertSummary>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Aggregate alert statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStatistics {
    pub total_alerts: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_status: HashMap<String, usize>,
    pub by_type: HashMap<String, usize>,
    pub overdue_count: usize,
    pub assigned_count: usize,
    pub unassigned_count: usize,
}

/// Alert lifecycle service
pub struct AlertService {
    alerts: RwLock<HashMap<Uuid, Alert>>,
    numbering: DailySequence,
}

impl AlertService {
    pub fn new() -> Self {
        Self {
            alerts: RwLock::new(HashMap::new()),
            numbering: DailySequence::new("ALT"),
        }
    }

    /// Create a new alert; the due date derives from the severity SLA
    pub async fn create_alert(&self, request: CreateAlert) -> LifecycleResult<Alert> {
        if request.title.trim().is_empty() {
            return Err(LifecycleError::invalid("title must not be empty"));
        }
        if !(0.0..=100.0).contains(&request.risk_score) {
            return Err(LifecycleError::invalid(format!(
                "risk_score must be within [0, 100], got {}",
                request.risk_score
            )));
        }

        let now = Utc::now();
        let alert = Alert {
            alert_id: Uuid::new_v4(),
            alert_number: self.numbering.next(),
            alert_type: request.alert_type,
            severity: request.severity,
            status: AlertStatus::New,
            title: request.title,
            description: request.description,
            customer_id: request.customer_id,
            account_ids: request.account_ids,
            risk_score: request.risk_score,
            transaction_ids: request.transaction_ids,
            pattern_ids: request.pattern_ids,
            total_amount: request.total_amount,
            currency: request.currency,
            current_assignee: None,
            assignments: Vec::new(),
            comments: Vec::new(),
            evidence: Vec::new(),
            case_id: None,
            sar_required: false,
            tags: request.tags,
            version: 1,
            created_at: now,
            updated_at: now,
            due_date: now + Duration::days(request.severity.sla_days()),
            closed_at: None,
        };

        self.alerts.write().await.insert(alert.alert_id, alert.clone());
        info!(number = %alert.alert_number, severity = alert.severity.as_str(), "alert created");
        Ok(alert)
    }

    pub async fn get_alert(&self, alert_id: Uuid) -> Option<Alert> {
        self.alerts.read().await.get(&alert_id).cloned()
    }

    pub async fn get_alert_by_number(&self, number: &str) -> Option<Alert> {
        self.alerts
            .read()
            .await
            .values()
            .find(|a| a.alert_number == number)
            .cloned()
    }

    /// Apply a partial update; severity changes recompute the due date from
    /// the creation instant, status changes go through the state machine
    pub async fn update_alert(
        &self,
        alert_id: Uuid,
        update: UpdateAlert,
    ) -> LifecycleResult<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&alert_id)
            .ok_or_else(|| LifecycleError::not_found("alert".to_string(), alert_id.to_string()))?;

        if let Some(expected) = update.expected_version {
            if alert.version != expected {
                return Err(LifecycleError::conflict(format!(
                    "alert {} was modified concurrently (version {} != {})",
                    alert.alert_number, alert.version, expected
                )));
            }
        }

        if let Some(status) = update.status {
            if !alert.status.can_transition_to(status) {
                return Err(LifecycleError::transition(alert.status, status));
            }
            alert.status = status;
            if status.is_closed() {
                alert.closed_at = Some(Utc::now());
            }
        }
        if let Some(severity) = update.severity {
            alert.severity = severity;
            alert.due_date = alert.created_at + Duration::days(severity.sla_days());
        }
        if let Some(title) = update.title {
            alert.title = title;
        }
        if let Some(description) = update.description {
            alert.description = description;
        }
        if let Some(sar_required) = update.sar_required {
            alert.sar_required = sar_required;
        }
        if let Some(tags) = update.tags {
            alert.tags = tags;
        }

        alert.version += 1;
        alert.updated_at = Utc::now();
        Ok(alert.clone())
    }

    /// Assign the alert; a new alert moves to assigned, an alert under
    /// review goes back to assigned (the one legal back-edge)
    pub async fn assign_alert(
        &self,
        alert_id: Uuid,
        assignee: &str,
        assigned_by: &str,
        reason: Option<String>,
    ) -> LifecycleResult<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&alert_id)
            .ok_or_else(|| LifecycleError::not_found("alert".to_string(), alert_id.to_string()))?;

        match alert.status {
            AlertStatus::New | AlertStatus::UnderReview => {
                alert.status = AlertStatus::Assigned;
            }
            AlertStatus::Assigned => {}
            other => return Err(LifecycleError::transition(other, AlertStatus::Assigned)),
        }

        alert.assignments.push(AlertAssignment {
            assigned_to: assignee.to_string(),
            assigned_by: assigned_by.to_string(),
            assigned_at: Utc::now(),
            reason,
        });
        alert.current_assignee = Some(assignee.to_string());
        alert.version += 1;
        alert.updated_at = Utc::now();
        debug!(number = %alert.alert_number, assignee, "alert assigned");
        Ok(alert.clone())
    }

    /// Move an assigned alert into review
    pub async fn begin_review(&self, alert_id: Uuid) -> LifecycleResult<Alert> {
        self.update_alert(
            alert_id,
            UpdateAlert {
                status: Some(AlertStatus::UnderReview),
                ..Default::default()
            },
        )
        .await
    }

    /// Escalate an alert under review
    pub async fn escalate_alert(
        &self,
        alert_id: Uuid,
        escalated_by: &str,
        reason: &str,
    ) -> LifecycleResult<Alert> {
        self.update_alert(
            alert_id,
            UpdateAlert {
                status: Some(AlertStatus::Escalated),
                ..Default::default()
            },
        )
        .await?;
        let alert = self
            .add_comment(
                alert_id,
                escalated_by,
                escalated_by,
                &format!("Alert escalated: {reason}"),
                true,
            )
            .await?;
        info!(number = %alert.alert_number, reason, "alert escalated");
        Ok(alert)
    }

    /// Close an alert as a true or false positive
    pub async fn close_alert(
        &self,
        alert_id: Uuid,
        is_true_positive: bool,
        closed_by: &str,
        notes: &str,
    ) -> LifecycleResult<Alert> {
        let status = if is_true_positive {
            AlertStatus::ClosedTruePositive
        } else {
            AlertStatus::ClosedFalsePositive
        };
        self.update_alert(
            alert_id,
            UpdateAlert {
                status: Some(status),
                ..Default::default()
            },
        )
        .await?;
        self.add_comment(
            alert_id,
            closed_by,
            closed_by,
            &format!("Alert closed: {notes}"),
            true,
        )
        .await
    }

    /// Record that a SAR was filed off the back of this alert
    pub async fn mark_sar_filed(&self, alert_id: Uuid) -> LifecycleResult<Alert> {
        self.update_alert(
            alert_id,
            UpdateAlert {
                status: Some(AlertStatus::SarFiled),
                ..Default::default()
            },
        )
        .await
    }

    /// Append a comment
    pub async fn add_comment(
        &self,
        alert_id: Uuid,
        author_id: &str,
        author_name: &str,
        content: &str,
        is_internal: bool,
    ) -> LifecycleResult<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&alert_id)
            .ok_or_else(|| LifecycleError::not_found("alert".to_string(), alert_id.to_string()))?;
        alert.comments.push(AlertComment {
            comment_id: Uuid::new_v4(),
            author_id: author_id.to_string(),
            author_name: author_name.to_string(),
            content: content.to_string(),
            is_internal,
            created_at: Utc::now(),
        });
        alert.version += 1;
        alert.updated_at = Utc::now();
        Ok(alert.clone())
    }

    /// Append an evidence reference
    pub async fn add_evidence(
        &self,
        alert_id: Uuid,
        evidence: AlertEvidence,
    ) -> LifecycleResult<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&alert_id)
            .ok_or_else(|| LifecycleError::not_found("alert".to_string(), alert_id.to_string()))?;
        alert.evidence.push(evidence);
        alert.version += 1;
        alert.updated_at = Utc::now();
        Ok(alert.clone())
    }

    /// Link the alert into a case
    pub async fn link_to_case(&self, alert_id: Uuid, case_id: Uuid) -> LifecycleResult<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&alert_id)
            .ok_or_else(|| LifecycleError::not_found("alert".to_string(), alert_id.to_string()))?;
        alert.case_id = Some(case_id);
        alert.version += 1;
        alert.updated_at = Utc::now();
        Ok(alert.clone())
    }

    /// Assign several alerts at once; returns how many were assigned
    pub async fn bulk_assign(
        &self,
        alert_ids: &[Uuid],
        assignee: &str,
        assigned_by: &str,
    ) -> usize {
        let mut count = 0;
        for alert_id in alert_ids {
            if self
                .assign_alert(*alert_id, assignee, assigned_by, None)
                .await
                .is_ok()
            {
                count += 1;
            }
        }
        count
    }

    pub async fn alerts_for_customer(&self, customer_id: &str) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .values()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect()
    }

    pub async fn open_alerts(&self) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .values()
            .filter(|a| !a.status.is_closed())
            .cloned()
            .collect()
    }

    /// Search with filters, sorting, and pagination
    pub async fn search_alerts(&self, criteria: &AlertSearchCriteria) -> AlertPage {
        let now = Utc::now();
        let alerts = self.alerts.read().await;
        let mut matching: Vec<&Alert> = alerts
            .values()
            .filter(|a| Self::matches(a, criteria, now))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match criteria.sort_by {
                AlertSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                AlertSortField::DueDate => a.due_date.cmp(&b.due_date),
                AlertSortField::RiskScore => a
                    .risk_score
                    .partial_cmp(&b.risk_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
                AlertSortField::Severity => a.severity.cmp(&b.severity),
            };
            match criteria.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len();
        let page = criteria.page.max(1);
        let start = (page - 1).saturating_mul(criteria.page_size);
        let items = matching
            .into_iter()
            .skip(start)
            .take(criteria.page_size)
            .map(|a| AlertSummary {
                alert_id: a.alert_id,
                alert_number: a.alert_number.clone(),
                alert_type: a.alert_type,
                severity: a.severity,
                status: a.status,
                customer_id: a.customer_id.clone(),
                risk_score: a.risk_score,
                current_assignee: a.current_assignee.clone(),
                created_at: a.created_at,
                due_date: a.due_date,
            })
            .collect();

        AlertPage {
            items,
            total,
            page,
            page_size: criteria.page_size,
        }
    }

    fn matches(alert: &Alert, criteria: &AlertSearchCriteria, now: DateTime<Utc>) -> bool {
        if let Some(types) = &criteria.alert_types {
            if !types.contains(&alert.alert_type) {
                return false;
            }
        }
        if let Some(severities) = &criteria.severities {
            if !severities.contains(&alert.severity) {
                return false;
            }
        }
        if let Some(statuses) = &criteria.statuses {
            if !statuses.contains(&alert.status) {
                return false;
            }
        }
        if let Some(customers) = &criteria.customer_ids {
            if !customers.contains(&alert.customer_id) {
                return false;
            }
        }
        if let Some(assignees) = &criteria.assignees {
            match &alert.current_assignee {
                Some(assignee) if assignees.contains(assignee) => {}
                _ => return false,
            }
        }
        if let Some(from) = criteria.date_from {
            if alert.created_at < from {
                return false;
            }
        }
        if let Some(to) = criteria.date_to {
            if alert.created_at > to {
                return false;
            }
        }
        if let Some(min) = criteria.min_risk_score {
            if alert.risk_score < min {
                return false;
            }
        }
        if let Some(max) = criteria.max_risk_score {
            if alert.risk_score > max {
                return false;
            }
        }
        if criteria.overdue_only && !alert.is_overdue(now) {
            return false;
        }
        if criteria.unassigned_only && alert.current_assignee.is_some() {
            return false;
        }
        true
    }

    /// Aggregate statistics
    pub async fn get_statistics(&self) -> AlertStatistics {
        let now = Utc::now();
        let alerts = self.alerts.read().await;
        let mut stats = AlertStatistics {
            total_alerts: alerts.len(),
            ..Default::default()
        };
        for alert in alerts.values() {
            *stats
                .by_severity
                .entry(alert.severity.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_status
                .entry(alert.status.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_type
                .entry(alert.alert_type.as_str().to_string())
                .or_insert(0) += 1;
            if alert.is_overdue(now) {
                stats.overdue_count += 1;
            }
            if alert.current_assignee.is_some() {
                stats.assigned_count += 1;
            } else {
                stats.unassigned_count += 1;
            }
        }
        stats
    }
}

impl Default for AlertService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(severity: AlertSeverity) -> CreateAlert {
        CreateAlert::new(
            AlertType::Structuring,
            severity,
            "Possible structuring activity",
            "C1",
        )
    }

    async fn alert_under_review(service: &AlertService) -> Alert {
        let alert = service.create_alert(request(AlertSeverity::High)).await.unwrap();
        service
            .assign_alert(alert.alert_id, "analyst1", "supervisor", None)
            .await
            .unwrap();
        service.begin_review(alert.alert_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_alert_sets_sla_due_date() {
        let service = AlertService::new();
        for (severity, days) in [
            (AlertSeverity::Low, 30),
            (AlertSeverity::Medium, 14),
            (AlertSeverity::High, 7),
            (AlertSeverity::Critical, 3),
        ] {
            let alert = service.create_alert(request(severity)).await.unwrap();
            assert_eq!(alert.due_date, alert.created_at + Duration::days(days));
            assert_eq!(alert.status, AlertStatus::New);
        }
    }

    #[tokio::test]
    async fn test_alert_numbers_increase_within_day() {
        let service = AlertService::new();
        let mut last_suffix = 0u32;
        for _ in 0..5 {
            let alert = service.create_alert(request(AlertSeverity::Low)).await.unwrap();
            let suffix: u32 = alert
                .alert_number
                .rsplit('-')
                .next()
                .unwrap()
                .parse()
                .unwrap();
            assert_eq!(suffix, last_suffix + 1);
            last_suffix = suffix;
        }
    }

    #[tokio::test]
    async fn test_severity_change_recomputes_due_from_creation() {
        let service = AlertService::new();
        let alert = service.create_alert(request(AlertSeverity::Low)).await.unwrap();

        let updated = service
            .update_alert(
                alert.alert_id,
                UpdateAlert {
                    severity: Some(AlertSeverity::Critical),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.due_date, alert.created_at + Duration::days(3));
    }

    #[tokio::test]
    async fn test_lifecycle_happy_path() {
        let service = AlertService::new();
        let alert = service.create_alert(request(AlertSeverity::High)).await.unwrap();

        let assigned = service
            .assign_alert(alert.alert_id, "analyst1", "supervisor", None)
            .await
            .unwrap();
        assert_eq!(assigned.status, AlertStatus::Assigned);
        assert_eq!(assigned.current_assignee.as_deref(), Some("analyst1"));

        let reviewing = service.begin_review(alert.alert_id).await.unwrap();
        assert_eq!(reviewing.status, AlertStatus::UnderReview);

        let closed = service
            .close_alert(alert.alert_id, true, "analyst1", "confirmed structuring")
            .await
            .unwrap();
        assert_eq!(closed.status, AlertStatus::ClosedTruePositive);
        assert!(closed.closed_at.is_some());

        let filed = service.mark_sar_filed(alert.alert_id).await.unwrap();
        assert_eq!(filed.status, AlertStatus::SarFiled);
    }

    #[tokio::test]
    async fn test_illegal_transitions_rejected() {
        let service = AlertService::new();
        let alert = service.create_alert(request(AlertSeverity::High)).await.unwrap();

        // New alerts cannot jump straight to closed or filed.
        for status in [
            AlertStatus::UnderReview,
            AlertStatus::ClosedTruePositive,
            AlertStatus::SarFiled,
        ] {
            let err = service
                .update_alert(
                    alert.alert_id,
                    UpdateAlert {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.category(), "invalid");
        }
    }

    #[tokio::test]
    async fn test_reassignment_from_review_is_allowed() {
        let service = AlertService::new();
        let alert = alert_under_review(&service).await;

        let reassigned = service
            .assign_alert(
                alert.alert_id,
                "analyst2",
                "supervisor",
                Some("workload balancing".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(reassigned.status, AlertStatus::Assigned);
        assert_eq!(reassigned.assignments.len(), 2);
    }

    #[tokio::test]
    async fn test_escalation_path() {
        let service = AlertService::new();
        let alert = alert_under_review(&service).await;
        let escalated = service
            .escalate_alert(alert.alert_id, "analyst1", "large exposure")
            .await
            .unwrap();
        assert_eq!(escalated.status, AlertStatus::Escalated);

        let closed = service
            .close_alert(alert.alert_id, false, "supervisor", "cleared after review")
            .await
            .unwrap();
        assert_eq!(closed.status, AlertStatus::ClosedFalsePositive);
    }

    #[tokio::test]
    async fn test_optimistic_locking_conflict() {
        let service = AlertService::new();
        let alert = service.create_alert(request(AlertSeverity::Low)).await.unwrap();

        service
            .update_alert(
                alert.alert_id,
                UpdateAlert {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .update_alert(
                alert.alert_id,
                UpdateAlert {
                    title: Some("Stale".to_string()),
                    expected_version: Some(alert.version),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), "conflict");
    }

    #[tokio::test]
    async fn test_comments_and_evidence_append_only() {
        let service = AlertService::new();
        let alert = service.create_alert(request(AlertSeverity::Low)).await.unwrap();

        service
            .add_comment(alert.alert_id, "a1", "Analyst One", "first look", true)
            .await
            .unwrap();
        let updated = service
            .add_evidence(
                alert.alert_id,
                AlertEvidence {
                    evidence_id: Uuid::new_v4(),
                    evidence_type: "statement".to_string(),
                    description: "bank statement".to_string(),
                    document_path: Some("docs/stmt-01.pdf".to_string()),
                    added_by: "a1".to_string(),
                    added_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_search_and_pagination() {
        let service = AlertService::new();
        for i in 0..7 {
            let mut req = request(if i % 2 == 0 {
                AlertSeverity::High
            } else {
                AlertSeverity::Low
            });
            req.risk_score = i as f64 * 10.0;
            service.create_alert(req).await.unwrap();
        }

        let criteria = AlertSearchCriteria {
            severities: Some(vec![AlertSeverity::High]),
            page_size: 2,
            sort_by: AlertSortField::RiskScore,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let page = service.search_alerts(&criteria).await;
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].risk_score >= page.items[1].risk_score);

        let page2 = service
            .search_alerts(&AlertSearchCriteria {
                page: 2,
                ..criteria
            })
            .await;
        assert_eq!(page2.items.len(), 2);
    }

    #[tokio::test]
    async fn test_statistics_counts() {
        let service = AlertService::new();
        let alert = service.create_alert(request(AlertSeverity::High)).await.unwrap();
        service.create_alert(request(AlertSeverity::Low)).await.unwrap();
        service
            .assign_alert(alert.alert_id, "analyst1", "supervisor", None)
            .await
            .unwrap();

        let stats = service.get_statistics().await;
        assert_eq!(stats.total_alerts, 2);
        assert_eq!(stats.assigned_count, 1);
        assert_eq!(stats.unassigned_count, 1);
        assert_eq!(stats.by_severity.get("high"), Some(&1));
    }

    #[tokio::test]
    async fn test_bulk_assign_skips_unassignable() {
        let service = AlertService::new();
        let a = service.create_alert(request(AlertSeverity::Low)).await.unwrap();
        let b = alert_under_review(&service).await;
        service
            .close_alert(b.alert_id, false, "x", "noise")
            .await
            .unwrap();

        let count = service
            .bulk_assign(&[a.alert_id, b.alert_id], "analyst1", "supervisor")
            .await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_invalid_risk_score_rejected() {
        let service = AlertService::new();
        let mut req = request(AlertSeverity::Low);
        req.risk_score = 150.0;
        assert!(service.create_alert(req).await.is_err());
    }
}
