// =====================================================================================
// File: core-lifecycle/src/case.rs
// Description: AML investigation case lifecycle management
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    alert::SortOrder,
    error::{LifecycleError, LifecycleResult},
    numbering::DailySequence,
};

/// Case priority; drives the SLA due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl CasePriority {
    /// SLA in days: LOW 90, MEDIUM 60, HIGH 30, URGENT 14
    pub fn sla_days(&self) -> i64 {
        match self {
            CasePriority::Low => 90,
            CasePriority::Medium => 60,
            CasePriority::High => 30,
            CasePriority::Urgent => 14,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CasePriority::Low => "low",
            CasePriority::Medium => "medium",
            CasePriority::High => "high",
            CasePriority::Urgent => "urgent",
        }
    }
}

/// Investigation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseCategory {
    MoneyLaundering,
    TerroristFinancing,
    Fraud,
    SanctionsViolation,
    Structuring,
    Other,
}

impl CaseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseCategory::MoneyLaundering => "money_laundering",
            CaseCategory::TerroristFinancing => "terrorist_financing",
            CaseCategory::Fraud => "fraud",
            CaseCategory::SanctionsViolation => "sanctions_violation",
            CaseCategory::Structuring => "structuring",
            CaseCategory::Other => "other",
        }
    }
}

/// Case workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Draft,
    Open,
    InProgress,
    PendingReview,
    Escalated,
    PendingSar,
    SarFiled,
    ClosedNoAction,
    ClosedWithAction,
}

impl CaseStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, CaseStatus::ClosedNoAction | CaseStatus::ClosedWithAction)
    }

    /// Legal transitions; any open state may close directly
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        use CaseStatus::*;
        if self.is_closed() {
            return false;
        }
        if matches!(next, ClosedNoAction | ClosedWithAction) {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Open)
                | (Open, InProgress)
                | (InProgress, PendingReview)
                | (InProgress, Escalated)
                | (InProgress, PendingSar)
                | (PendingSar, SarFiled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "draft",
            CaseStatus::Open => "open",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::PendingReview => "pending_review",
            CaseStatus::Escalated => "escalated",
            CaseStatus::PendingSar => "pending_sar",
            CaseStatus::SarFiled => "sar_filed",
            CaseStatus::ClosedNoAction => "closed_no_action",
            CaseStatus::ClosedWithAction => "closed_with_action",
        }
    }
}

/// How a closed case was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseResolution {
    NoAction,
    WithAction,
}

/// Append-only timeline entry, generated for every material event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseTimelineEntry {
    pub entry_id: Uuid,
    pub activity_type: String,
    pub description: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// Investigation finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationFinding {
    pub finding_id: Uuid,
    pub finding_type: String,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Document reference; only the path is stored here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    pub document_id: Uuid,
    pub document_name: String,
    pub document_type: String,
    pub file_path: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Party connected to the investigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity_ref: String,
    pub entity_type: String,
    pub entity_name: String,
    pub relationship: String,
}

/// One assignment on a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAssignment {
    pub assigned_to: String,
    pub assigned_by: String,
    pub role: String,
    pub is_primary: bool,
    pub assigned_at: DateTime<Utc>,
}

/// An AML investigation case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: Uuid,
    /// Public number, `CASE-YYYYMMDD-NNNNNN`
    pub case_number: String,
    pub title: String,
    pub description: String,
    pub category: CaseCategory,
    pub priority: CasePriority,
    pub status: CaseStatus,
    pub primary_subject_id: String,
    pub primary_subject_name: String,
    pub alert_ids: Vec<Uuid>,
    pub sar_ids: Vec<Uuid>,
    pub timeline: Vec<CaseTimelineEntry>,
    pub findings: Vec<InvestigationFinding>,
    pub documents: Vec<CaseDocument>,
    pub related_entities: Vec<RelatedEntity>,
    pub assignments: Vec<CaseAssignment>,
    pub lead_investigator: Option<String>,
    pub total_suspicious_amount: Decimal,
    pub sar_required: bool,
    pub resolution: Option<CaseResolution>,
    pub resolution_summary: Option<String>,
    pub tags: Vec<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Case {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_closed() && self.due_date < now
    }
}

/// Request to create a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCase {
    pub title: String,
    pub description: String,
    pub category: CaseCategory,
    pub priority: CasePriority,
    pub primary_subject_id: String,
    pub primary_subject_name: String,
    pub alert_ids: Vec<Uuid>,
    pub tags: Vec<String>,
}

impl CreateCase {
    pub fn new(
        title: &str,
        category: CaseCategory,
        priority: CasePriority,
        subject_id: &str,
        subject_name: &str,
    ) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            category,
            priority,
            primary_subject_id: subject_id.to_string(),
            primary_subject_name: subject_name.to_string(),
            alert_ids: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// Search criteria for cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSearchCriteria {
    pub statuses: Option<Vec<CaseStatus>>,
    pub priorities: Option<Vec<CasePriority>>,
    pub categories: Option<Vec<CaseCategory>>,
    pub investigators: Option<Vec<String>>,
    pub subject_ids: Option<Vec<String>>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sar_required: Option<bool>,
    pub overdue_only: bool,
    pub page: usize,
    pub page_size: usize,
    pub sort_order: SortOrder,
}

impl Default for CaseSearchCriteria {
    fn default() -> Self {
        Self {
            statuses: None,
            priorities: None,
            categories: None,
            investigators: None,
            subject_ids: None,
            date_from: None,
            date_to: None,
            sar_required: None,
            overdue_only: false,
            page: 1,
            page_size: 50,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Listing row for case search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case_id: Uuid,
    pub case_number: String,
    pub title: String,
    pub status: CaseStatus,
    pub priority: CasePriority,
    pub category: CaseCategory,
    pub primary_subject_name: String,
    pub alert_count: usize,
    pub lead_investigator: Option<String>,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// One page of case search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasePage {
    pub items: Vec<CaseSummary>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Aggregate case statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseStatistics {
    pub total_cases: usize,
    pub by_status: HashMap<String, usize>,
    pub by_priority: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub open_cases: usize,
    pub overdue_count: usize,
    pub closed_this_month: usize,
}

/// Case lifecycle service
pub struct CaseService {
    cases: RwLock<HashMap<Uuid, Case>>,
    numbering: DailySequence,
}

impl CaseService {
    pub fn new() -> Self {
        Self {
            cases: RwLock::new(HashMap::new()),
            numbering: DailySequence::new("CASE"),
        }
    }

    /// Create a case in draft; the due date derives from the priority SLA
    pub async fn create_case(&self, request: CreateCase, created_by: &str) -> LifecycleResult<Case> {
        if request.title.trim().is_empty() {
            return Err(LifecycleError::invalid("title must not be empty"));
        }

        let now = Utc::now();
        let mut case = Case {
            case_id: Uuid::new_v4(),
            case_number: self.numbering.next(),
            title: request.title,
            description: request.description,
            category: request.category,
            priority: request.priority,
            status: CaseStatus::Draft,
            primary_subject_id: request.primary_subject_id,
            primary_subject_name: request.primary_subject_name,
            alert_ids: request.alert_ids,
            sar_ids: Vec::new(),
            timeline: Vec::new(),
            findings: Vec::new(),
            documents: Vec::new(),
            related_entities: Vec::new(),
            assignments: Vec::new(),
            lead_investigator: None,
            total_suspicious_amount: Decimal::ZERO,
            sar_required: false,
            resolution: None,
            resolution_summary: None,
            tags: request.tags,
            version: 1,
            created_at: now,
            updated_at: now,
            due_date: now + Duration::days(request.priority.sla_days()),
            opened_at: None,
            closed_at: None,
        };
        push_timeline(
            &mut case,
            "case_created",
            &format!("Case created by {created_by}"),
            created_by,
        );

        self.cases.write().await.insert(case.case_id, case.clone());
        info!(number = %case.case_number, priority = case.priority.as_str(), "case created");
        Ok(case)
    }

    pub async fn get_case(&self, case_id: Uuid) -> Option<Case> {
        self.cases.read().await.get(&case_id).cloned()
    }

    pub async fn get_case_by_number(&self, number: &str) -> Option<Case> {
        self.cases
            .read()
            .await
            .values()
            .find(|c| c.case_number == number)
            .cloned()
    }

    /// Drive the case status machine
    pub async fn transition_case(
        &self,
        case_id: Uuid,
        next: CaseStatus,
        actor: &str,
    ) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        if !case.status.can_transition_to(next) {
            return Err(LifecycleError::transition(case.status, next));
        }

        let previous = case.status;
        case.status = next;
        match next {
            CaseStatus::Open => case.opened_at = Some(Utc::now()),
            status if status.is_closed() => case.closed_at = Some(Utc::now()),
            _ => {}
        }
        push_timeline(
            case,
            "status_changed",
            &format!("Status changed from {} to {}", previous.as_str(), next.as_str()),
            actor,
        );
        case.version += 1;
        case.updated_at = Utc::now();
        debug!(number = %case.case_number, from = previous.as_str(), to = next.as_str(), "case transitioned");
        Ok(case.clone())
    }

    /// Open a draft case for investigation
    pub async fn open_case(&self, case_id: Uuid, opened_by: &str) -> LifecycleResult<Case> {
        self.transition_case(case_id, CaseStatus::Open, opened_by).await
    }

    /// Assign the case; the lead-investigator role also sets the lead
    pub async fn assign_case(
        &self,
        case_id: Uuid,
        assignee: &str,
        assigned_by: &str,
        role: &str,
    ) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        if case.status.is_closed() {
            return Err(LifecycleError::invalid("cannot assign a closed case"));
        }

        let is_primary = role == "lead_investigator";
        case.assignments.push(CaseAssignment {
            assigned_to: assignee.to_string(),
            assigned_by: assigned_by.to_string(),
            role: role.to_string(),
            is_primary,
            assigned_at: Utc::now(),
        });
        if is_primary {
            case.lead_investigator = Some(assignee.to_string());
        }
        push_timeline(
            case,
            "case_assigned",
            &format!("Case assigned to {assignee} as {role}"),
            assigned_by,
        );
        case.version += 1;
        case.updated_at = Utc::now();
        Ok(case.clone())
    }

    /// Record an investigation finding
    pub async fn add_finding(
        &self,
        case_id: Uuid,
        finding: InvestigationFinding,
    ) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        let actor = finding.created_by.clone();
        let description = format!("New finding added: {}", finding.finding_type);
        case.findings.push(finding);
        push_timeline(case, "finding_added", &description, &actor);
        case.version += 1;
        case.updated_at = Utc::now();
        Ok(case.clone())
    }

    /// Attach a document reference
    pub async fn add_document(
        &self,
        case_id: Uuid,
        document: CaseDocument,
    ) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        let actor = document.uploaded_by.clone();
        let description = format!("Document added: {}", document.document_name);
        case.documents.push(document);
        push_timeline(case, "document_added", &description, &actor);
        case.version += 1;
        case.updated_at = Utc::now();
        Ok(case.clone())
    }

    /// Connect a related party
    pub async fn add_related_entity(
        &self,
        case_id: Uuid,
        entity: RelatedEntity,
        added_by: &str,
    ) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        let description = format!("Related entity added: {}", entity.entity_name);
        case.related_entities.push(entity);
        push_timeline(case, "entity_added", &description, added_by);
        case.version += 1;
        case.updated_at = Utc::now();
        Ok(case.clone())
    }

    /// Link an alert into the case
    pub async fn link_alert(
        &self,
        case_id: Uuid,
        alert_id: Uuid,
        linked_by: &str,
    ) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        if !case.alert_ids.contains(&alert_id) {
            case.alert_ids.push(alert_id);
            push_timeline(
                case,
                "alert_linked",
                &format!("Alert {alert_id} linked to case"),
                linked_by,
            );
            case.version += 1;
            case.updated_at = Utc::now();
        }
        Ok(case.clone())
    }

    /// Link a filed SAR back to the case
    pub async fn link_sar(&self, case_id: Uuid, sar_id: Uuid) -> LifecycleResult<Case> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        if !case.sar_ids.contains(&sar_id) {
            case.sar_ids.push(sar_id);
            case.version += 1;
            case.updated_at = Utc::now();
        }
        Ok(case.clone())
    }

    /// Escalate an in-progress case
    pub async fn escalate_case(
        &self,
        case_id: Uuid,
        escalated_by: &str,
        reason: &str,
    ) -> LifecycleResult<Case> {
        self.transition_case(case_id, CaseStatus::Escalated, escalated_by)
            .await?;
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        push_timeline(
            case,
            "case_escalated",
            &format!("Case escalated: {reason}"),
            escalated_by,
        );
        info!(number = %case.case_number, reason, "case escalated");
        Ok(case.clone())
    }

    /// Close the case with a resolution
    pub async fn close_case(
        &self,
        case_id: Uuid,
        resolution: CaseResolution,
        summary: &str,
        closed_by: &str,
    ) -> LifecycleResult<Case> {
        let next = match resolution {
            CaseResolution::NoAction => CaseStatus::ClosedNoAction,
            CaseResolution::WithAction => CaseStatus::ClosedWithAction,
        };
        self.transition_case(case_id, next, closed_by).await?;

        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .ok_or_else(|| LifecycleError::not_found("case".to_string(), case_id.to_string()))?;
        case.resolution = Some(resolution);
        case.resolution_summary = Some(summary.to_string());
        push_timeline(
            case,
            "case_closed",
            &format!("Case closed: {summary}"),
            closed_by,
        );
        Ok(case.clone())
    }

    pub async fn cases_for_subject(&self, subject_id: &str) -> Vec<Case> {
        self.cases
            .read()
            .await
            .values()
            .filter(|c| c.primary_subject_id == subject_id)
            .cloned()
            .collect()
    }

    /// Search with filters and pagination, sorted by creation time
    pub async fn search_cases(&self, criteria: &CaseSearchCriteria) -> CasePage {
        let now = Utc::now();
        let cases = self.cases.read().await;
        let mut matching: Vec<&Case> = cases
            .values()
            .filter(|c| Self::matches(c, criteria, now))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = a.created_at.cmp(&b.created_at);
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
            .map(|c| CaseSummary {
                case_id: c.case_id,
                case_number: c.case_number.clone(),
                title: c.title.clone(),
                status: c.status,
                priority: c.priority,
                category: c.category,
                primary_subject_name: c.primary_subject_name.clone(),
                alert_count: c.alert_ids.len(),
                lead_investigator: c.lead_investigator.clone(),
                created_at: c.created_at,
                due_date: c.due_date,
            })
            .collect();

        CasePage {
            items,
            total,
            page,
            page_size: criteria.page_size,
        }
    }

    fn matches(case: &Case, criteria: &CaseSearchCriteria, now: DateTime<Utc>) -> bool {
        if let Some(statuses) = &criteria.statuses {
            if !statuses.contains(&case.status) {
                return false;
            }
        }
        if let Some(priorities) = &criteria.priorities {
            if !priorities.contains(&case.priority) {
                return false;
            }
        }
        if let Some(categories) = &criteria.categories {
            if !categories.contains(&case.category) {
                return false;
            }
        }
        if let Some(investigators) = &criteria.investigators {
            match &case.lead_investigator {
                Some(lead) if investigators.contains(lead) => {}
                _ => return false,
            }
        }
        if let Some(subjects) = &criteria.subject_ids {
            if !subjects.contains(&case.primary_subject_id) {
                return false;
            }
        }
        if let Some(from) = criteria.date_from {
            if case.created_at < from {
                return false;
            }
        }
        if let Some(to) = criteria.date_to {
            if case.created_at > to {
                return false;
            }
        }
        if let Some(sar_required) = criteria.sar_required {
            if case.sar_required != sar_required {
                return false;
            }
        }
        if criteria.overdue_only && !case.is_overdue(now) {
            return false;
        }
        true
    }

    /// Aggregate statistics
    pub async fn get_statistics(&self) -> CaseStatistics {
        let now = Utc::now();
        let month_start = now
            .date_naive()
            .with_day(1)
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
            .unwrap_or(now);

        let cases = self.cases.read().await;
        let mut stats = CaseStatistics {
            total_cases: cases.len(),
            ..Default::default()
        };
        for case in cases.values() {
            *stats
                .by_status
                .entry(case.status.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_priority
                .entry(case.priority.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_category
                .entry(case.category.as_str().to_string())
                .or_insert(0) += 1;
            if !case.status.is_closed() {
                stats.open_cases += 1;
            }
            if case.is_overdue(now) {
                stats.overdue_count += 1;
            }
            if case.closed_at.map(|t| t >= month_start).unwrap_or(false) {
                stats.closed_this_month += 1;
            }
        }
        stats
    }
}

impl Default for CaseService {
    fn default() -> Self {
        Self::new()
    }
}

fn push_timeline(case: &mut Case, activity_type: &str, description: &str, actor: &str) {
    case.timeline.push(CaseTimelineEntry {
        entry_id: Uuid::new_v4(),
        activity_type: activity_type.to_string(),
        description: description.to_string(),
        actor: actor.to_string(),
        created_at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCase {
        CreateCase::new(
            "Structuring investigation",
            CaseCategory::Structuring,
            CasePriority::High,
            "C1",
            "Jane Roe",
        )
    }

    async fn case_in_progress(service: &CaseService) -> Case {
        let case = service.create_case(request(), "supervisor").await.unwrap();
        service.open_case(case.case_id, "supervisor").await.unwrap();
        service
            .transition_case(case.case_id, CaseStatus::InProgress, "analyst1")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_case_sets_sla_and_timeline() {
        let service = CaseService::new();
        let case = service.create_case(request(), "supervisor").await.unwrap();
        assert_eq!(case.status, CaseStatus::Draft);
        assert_eq!(case.due_date, case.created_at + Duration::days(30));
        assert_eq!(case.timeline.len(), 1);
        assert_eq!(case.timeline[0].activity_type, "case_created");
        assert!(case.case_number.starts_with("CASE-"));
    }

    #[tokio::test]
    async fn test_priority_sla_mapping() {
        assert_eq!(CasePriority::Low.sla_days(), 90);
        assert_eq!(CasePriority::Medium.sla_days(), 60);
        assert_eq!(CasePriority::High.sla_days(), 30);
        assert_eq!(CasePriority::Urgent.sla_days(), 14);
    }

    #[tokio::test]
    async fn test_lifecycle_to_sar_filed() {
        let service = CaseService::new();
        let case = case_in_progress(&service).await;

        service
            .transition_case(case.case_id, CaseStatus::PendingSar, "analyst1")
            .await
            .unwrap();
        let filed = service
            .transition_case(case.case_id, CaseStatus::SarFiled, "analyst1")
            .await
            .unwrap();
        assert_eq!(filed.status, CaseStatus::SarFiled);

        let closed = service
            .close_case(
                case.case_id,
                CaseResolution::WithAction,
                "SAR filed with FinCEN",
                "analyst1",
            )
            .await
            .unwrap();
        assert_eq!(closed.status, CaseStatus::ClosedWithAction);
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.resolution, Some(CaseResolution::WithAction));
    }

    #[tokio::test]
    async fn test_any_open_state_can_close() {
        let service = CaseService::new();
        let case = service.create_case(request(), "supervisor").await.unwrap();
        // Straight from draft.
        let closed = service
            .close_case(case.case_id, CaseResolution::NoAction, "duplicate", "supervisor")
            .await
            .unwrap();
        assert_eq!(closed.status, CaseStatus::ClosedNoAction);
    }

    #[tokio::test]
    async fn test_closed_case_is_terminal() {
        let service = CaseService::new();
        let case = service.create_case(request(), "supervisor").await.unwrap();
        service
            .close_case(case.case_id, CaseResolution::NoAction, "noise", "supervisor")
            .await
            .unwrap();

        let err = service
            .open_case(case.case_id, "supervisor")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "invalid");
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let service = CaseService::new();
        let case = service.create_case(request(), "supervisor").await.unwrap();
        let err = service
            .transition_case(case.case_id, CaseStatus::SarFiled, "analyst1")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "invalid");
    }

    #[tokio::test]
    async fn test_timeline_records_every_activity() {
        let service = CaseService::new();
        let case = case_in_progress(&service).await;

        service
            .assign_case(case.case_id, "analyst2", "supervisor", "lead_investigator")
            .await
            .unwrap();
        service
            .add_finding(
                case.case_id,
                InvestigationFinding {
                    finding_id: Uuid::new_v4(),
                    finding_type: "unusual_pattern".to_string(),
                    description: "repeated sub-threshold deposits".to_string(),
                    created_by: "analyst2".to_string(),
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        service
            .add_document(
                case.case_id,
                CaseDocument {
                    document_id: Uuid::new_v4(),
                    document_name: "statement.pdf".to_string(),
                    document_type: "bank_statement".to_string(),
                    file_path: "cases/docs/statement.pdf".to_string(),
                    uploaded_by: "analyst2".to_string(),
                    uploaded_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        let with_entity = service
            .add_related_entity(
                case.case_id,
                RelatedEntity {
                    entity_ref: "C2".to_string(),
                    entity_type: "customer".to_string(),
                    entity_name: "Sam Mills".to_string(),
                    relationship: "counterparty".to_string(),
                },
                "analyst2",
            )
            .await
            .unwrap();

        let activities: Vec<&str> = with_entity
            .timeline
            .iter()
            .map(|t| t.activity_type.as_str())
            .collect();
        assert!(activities.contains(&"case_created"));
        assert!(activities.contains(&"status_changed"));
        assert!(activities.contains(&"case_assigned"));
        assert!(activities.contains(&"finding_added"));
        assert!(activities.contains(&"document_added"));
        assert!(activities.contains(&"entity_added"));
        assert_eq!(with_entity.lead_investigator.as_deref(), Some("analyst2"));
    }

    #[tokio::test]
    async fn test_link_alert_is_idempotent() {
        let service = CaseService::new();
        let case = service.create_case(request(), "supervisor").await.unwrap();
        let alert_id = Uuid::new_v4();

        service.link_alert(case.case_id, alert_id, "analyst1").await.unwrap();
        let linked = service.link_alert(case.case_id, alert_id, "analyst1").await.unwrap();
        assert_eq!(linked.alert_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_escalation() {
        let service = CaseService::new();
        let case = case_in_progress(&service).await;
        let escalated = service
            .escalate_case(case.case_id, "analyst1", "cross-border exposure")
            .await
            .unwrap();
        assert_eq!(escalated.status, CaseStatus::Escalated);
    }

    #[tokio::test]
    async fn test_search_and_statistics() {
        let service = CaseService::new();
        service.create_case(request(), "supervisor").await.unwrap();
        let mut fraud = request();
        fraud.category = CaseCategory::Fraud;
        fraud.priority = CasePriority::Urgent;
        let fraud_case = service.create_case(fraud, "supervisor").await.unwrap();
        service
            .close_case(fraud_case.case_id, CaseResolution::WithAction, "done", "supervisor")
            .await
            .unwrap();

        let page = service
            .search_cases(&CaseSearchCriteria {
                categories: Some(vec![CaseCategory::Fraud]),
                ..Default::default()
            })
            .await;
        assert_eq!(page.total, 1);

        let stats = service.get_statistics().await;
        assert_eq!(stats.total_cases, 2);
        assert_eq!(stats.open_cases, 1);
        assert_eq!(stats.closed_this_month, 1);
        assert_eq!(
            stats.by_category.get("fraud").copied().unwrap_or(0)
                + stats.by_category.get("structuring").copied().unwrap_or(0),
            2
        );
    }

    #[tokio::test]
    async fn test_closed_case_invariant() {
        let service = CaseService::new();
        let case = service.create_case(request(), "supervisor").await.unwrap();
        let closed = service
            .close_case(case.case_id, CaseResolution::NoAction, "n/a", "supervisor")
            .await
            .unwrap();
        assert!(closed.closed_at.is_some());
        assert!(closed.status.is_closed());
        // Month arithmetic sanity for the statistics window.
        assert!(Utc::now().day() >= 1);
    }
}
