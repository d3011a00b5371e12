// =====================================================================================
// File: core-lifecycle/src/sar.rs
// Description: Suspicious Activity Report lifecycle and filing
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{LifecycleError, LifecycleResult},
    numbering::DailySequence,
};

/// SAR filing type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarType {
    Initial,
    Continuing,
    Corrected,
    Joint,
}

/// SAR workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarStatus {
    Draft,
    PendingReview,
    Approved,
    Submitted,
    Acknowledged,
    Amended,
}

impl SarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SarStatus::Draft => "draft",
            SarStatus::PendingReview => "pending_review",
            SarStatus::Approved => "approved",
            SarStatus::Submitted => "submitted",
            SarStatus::Acknowledged => "acknowledged",
            SarStatus::Amended => "amended",
        }
    }
}

/// Category of suspicious activity being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspiciousActivityType {
    MoneyLaundering,
    Structuring,
    TerroristFinancing,
    Fraud,
    IdentityTheft,
    SanctionsViolation,
    Other,
}

impl SuspiciousActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspiciousActivityType::MoneyLaundering => "money_laundering",
            SuspiciousActivityType::Structuring => "structuring",
            SuspiciousActivityType::TerroristFinancing => "terrorist_financing",
            SuspiciousActivityType::Fraud => "fraud",
            SuspiciousActivityType::IdentityTheft => "identity_theft",
            SuspiciousActivityType::SanctionsViolation => "sanctions_violation",
            SuspiciousActivityType::Other => "other",
        }
    }
}

/// Narrative section keys, in compilation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSection {
    Who,
    What,
    When,
    Where,
    Why,
    How,
}

impl NarrativeSection {
    pub const ORDER: [NarrativeSection; 6] = [
        NarrativeSection::Who,
        NarrativeSection::What,
        NarrativeSection::When,
        NarrativeSection::Where,
        NarrativeSection::Why,
        NarrativeSection::How,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeSection::Who => "who",
            NarrativeSection::What => "what",
            NarrativeSection::When => "when",
            NarrativeSection::Where => "where",
            NarrativeSection::Why => "why",
            NarrativeSection::How => "how",
        }
    }
}

/// Versioned narrative text for one section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub narrative_id: Uuid,
    pub section: NarrativeSection,
    pub content: String,
    pub version: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Subject of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub subject_id: Uuid,
    pub subject_type: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub account_numbers: Vec<String>,
    pub role_in_activity: String,
}

impl SubjectInfo {
    pub fn individual(full_name: &str) -> Self {
        Self {
            subject_id: Uuid::new_v4(),
            subject_type: "individual".to_string(),
            full_name: full_name.to_string(),
            date_of_birth: None,
            tax_id: None,
            address: None,
            account_numbers: Vec::new(),
            role_in_activity: "subject".to_string(),
        }
    }
}

/// One block of suspicious activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub activity_id: Uuid,
    pub activity_type: SuspiciousActivityType,
    pub description: String,
    pub date_first_detected: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_ended: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub currency: String,
    pub instruments_involved: Vec<String>,
    pub countries_involved: Vec<String>,
}

/// Transaction detail included in the filing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarTransaction {
    pub transaction_id: Uuid,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub direction: String,
    pub counterparty_name: Option<String>,
    pub counterparty_account: Option<String>,
}

/// Decision in the approval chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// One approval-chain record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarApproval {
    pub approval_id: Uuid,
    pub approver_id: String,
    pub approver_name: String,
    pub approver_role: String,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// One submission attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarSubmission {
    pub submission_id: Uuid,
    pub submission_date: DateTime<Utc>,
    pub submission_method: String,
    pub bsa_id: String,
    pub acknowledgment_number: Option<String>,
}

/// A Suspicious Activity Report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sar {
    pub sar_id: Uuid,
    /// Public number, `SAR-YYYYMMDD-NNNNNN`
    pub sar_number: String,
    pub sar_type: SarType,
    pub status: SarStatus,
    pub prior_sar_number: Option<String>,
    pub primary_activity_type: SuspiciousActivityType,
    pub subjects: Vec<SubjectInfo>,
    pub activities: Vec<SuspiciousActivity>,
    pub transactions: Vec<SarTransaction>,
    pub narratives: Vec<Narrative>,
    pub full_narrative: Option<String>,
    pub total_suspicious_amount: Decimal,
    pub approvals: Vec<SarApproval>,
    pub requires_approval_from: Vec<String>,
    pub submissions: Vec<SarSubmission>,
    pub case_ids: Vec<Uuid>,
    pub alert_ids: Vec<Uuid>,
    pub filing_deadline: DateTime<Utc>,
    pub extension_granted: bool,
    pub extension_reason: Option<String>,
    pub extended_deadline: Option<DateTime<Utc>>,
    pub prepared_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Sar {
    pub fn effective_deadline(&self) -> DateTime<Utc> {
        self.extended_deadline.unwrap_or(self.filing_deadline)
    }

    pub fn bsa_id(&self) -> Option<&str> {
        self.submissions.last().map(|s| s.bsa_id.as_str())
    }
}

/// Request to create a SAR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSar {
    pub sar_type: SarType,
    pub primary_activity_type: SuspiciousActivityType,
    pub prior_sar_number: Option<String>,
    pub case_ids: Vec<Uuid>,
    pub alert_ids: Vec<Uuid>,
}

impl CreateSar {
    pub fn initial(activity_type: SuspiciousActivityType) -> Self {
        Self {
            sar_type: SarType::Initial,
            primary_activity_type: activity_type,
            prior_sar_number: None,
            case_ids: Vec::new(),
            alert_ids: Vec::new(),
        }
    }
}

/// Aggregate SAR statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SarStatistics {
    pub total_sars: usize,
    pub by_status: HashMap<String, usize>,
    pub by_activity_type: HashMap<String, usize>,
    pub filed_this_month: usize,
    pub filed_this_year: usize,
    pub pending_filing: usize,
    pub overdue: usize,
}

/// SAR lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarConfig {
    /// Days from creation to the filing deadline
    pub filing_deadline_days: i64,
    /// Roles whose approval is required before filing
    pub required_approval_roles: Vec<String>,
}

impl Default for SarConfig {
    fn default() -> Self {
        Self {
            filing_deadline_days: 30,
            required_approval_roles: vec![
                "compliance_officer".to_string(),
                "bsa_officer".to_string(),
            ],
        }
    }
}

/// SAR lifecycle service
pub struct SarService {
    config: SarConfig,
    sars: RwLock<HashMap<Uuid, Sar>>,
    numbering: DailySequence,
}

impl SarService {
    pub fn new(config: SarConfig) -> Self {
        Self {
            config,
            sars: RwLock::new(HashMap::new()),
            numbering: DailySequence::new("SAR"),
        }
    }

    /// Create a SAR in draft with the default filing deadline
    pub async fn create_sar(&self, request: CreateSar, prepared_by: &str) -> LifecycleResult<Sar> {
        if request.sar_type == SarType::Corrected && request.prior_sar_number.is_none() {
            return Err(LifecycleError::invalid(
                "corrected SAR must reference a prior SAR number",
            ));
        }

        let now = Utc::now();
        let sar = Sar {
            sar_id: Uuid::new_v4(),
            sar_number: self.numbering.next(),
            sar_type: request.sar_type,
            status: SarStatus::Draft,
            prior_sar_number: request.prior_sar_number,
            primary_activity_type: request.primary_activity_type,
            subjects: Vec::new(),
            activities: Vec::new(),
            transactions: Vec::new(),
            narratives: Vec::new(),
            full_narrative: None,
            total_suspicious_amount: Decimal::ZERO,
            approvals: Vec::new(),
            requires_approval_from: Vec::new(),
            submissions: Vec::new(),
            case_ids: request.case_ids,
            alert_ids: request.alert_ids,
            filing_deadline: now + Duration::days(self.config.filing_deadline_days),
            extension_granted: false,
            extension_reason: None,
            extended_deadline: None,
            prepared_by: prepared_by.to_string(),
            created_at: now,
            updated_at: now,
            submitted_at: None,
        };

        self.sars.write().await.insert(sar.sar_id, sar.clone());
        info!(number = %sar.sar_number, "SAR created");
        Ok(sar)
    }

    pub async fn get_sar(&self, sar_id: Uuid) -> Option<Sar> {
        self.sars.read().await.get(&sar_id).cloned()
    }

    pub async fn get_sar_by_number(&self, number: &str) -> Option<Sar> {
        self.sars
            .read()
            .await
            .values()
            .find(|s| s.sar_number == number)
            .cloned()
    }

    /// Add a subject; only permitted while drafting
    pub async fn add_subject(&self, sar_id: Uuid, subject: SubjectInfo) -> LifecycleResult<Sar> {
        self.mutate_draft(sar_id, |sar| {
            sar.subjects.push(subject);
        })
        .await
    }

    /// Add a suspicious-activity block; the total rolls up
    pub async fn add_activity(
        &self,
        sar_id: Uuid,
        activity: SuspiciousActivity,
    ) -> LifecycleResult<Sar> {
        self.mutate_draft(sar_id, |sar| {
            sar.total_suspicious_amount += activity.total_amount;
            sar.activities.push(activity);
        })
        .await
    }

    /// Add a transaction detail
    pub async fn add_transaction(
        &self,
        sar_id: Uuid,
        transaction: SarTransaction,
    ) -> LifecycleResult<Sar> {
        self.mutate_draft(sar_id, |sar| {
            sar.transactions.push(transaction);
        })
        .await
    }

    /// Create or revise one narrative section; revisions bump the version
    /// and the full narrative is recompiled in WHO..HOW order
    pub async fn add_narrative(
        &self,
        sar_id: Uuid,
        section: NarrativeSection,
        content: &str,
        author: &str,
    ) -> LifecycleResult<Sar> {
        if content.trim().is_empty() {
            return Err(LifecycleError::invalid("narrative content must not be empty"));
        }
        self.mutate_draft(sar_id, |sar| {
            if let Some(existing) = sar.narratives.iter_mut().find(|n| n.section == section) {
                existing.content = content.to_string();
                existing.version += 1;
                existing.modified_by = Some(author.to_string());
                existing.modified_at = Some(Utc::now());
            } else {
                sar.narratives.push(Narrative {
                    narrative_id: Uuid::new_v4(),
                    section,
                    content: content.to_string(),
                    version: 1,
                    created_by: author.to_string(),
                    created_at: Utc::now(),
                    modified_by: None,
                    modified_at: None,
                });
            }
            sar.full_narrative = Some(compile_narrative(&sar.narratives));
        })
        .await
    }

    /// Submit the draft for the multi-role approval chain
    pub async fn submit_for_approval(&self, sar_id: Uuid) -> LifecycleResult<Sar> {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if sar.status != SarStatus::Draft {
            return Err(LifecycleError::transition(sar.status, SarStatus::PendingReview));
        }
        if sar.subjects.is_empty() {
            return Err(LifecycleError::invalid(
                "SAR requires at least one subject before review",
            ));
        }
        sar.status = SarStatus::PendingReview;
        sar.requires_approval_from = self.config.required_approval_roles.clone();
        sar.updated_at = Utc::now();
        debug!(number = %sar.sar_number, "SAR submitted for approval");
        Ok(sar.clone())
    }

    /// Record one role's approval; the union of approved roles must cover
    /// the required set before the SAR becomes approved
    pub async fn approve_sar(
        &self,
        sar_id: Uuid,
        approver_id: &str,
        approver_name: &str,
        approver_role: &str,
        comments: Option<String>,
    ) -> LifecycleResult<Sar> {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if sar.status != SarStatus::PendingReview {
            return Err(LifecycleError::invalid("SAR is not pending review"));
        }
        if !sar
            .requires_approval_from
            .iter()
            .any(|r| r == approver_role)
        {
            return Err(LifecycleError::invalid(format!(
                "role {approver_role} is not a required approver"
            )));
        }

        sar.approvals.push(SarApproval {
            approval_id: Uuid::new_v4(),
            approver_id: approver_id.to_string(),
            approver_name: approver_name.to_string(),
            approver_role: approver_role.to_string(),
            decision: ApprovalDecision::Approved,
            comments,
            decided_at: Utc::now(),
        });

        let approved_roles: Vec<&str> = sar
            .approvals
            .iter()
            .filter(|a| a.decision == ApprovalDecision::Approved)
            .map(|a| a.approver_role.as_str())
            .collect();
        if sar
            .requires_approval_from
            .iter()
            .all(|r| approved_roles.contains(&r.as_str()))
        {
            sar.status = SarStatus::Approved;
            info!(number = %sar.sar_number, "SAR fully approved");
        }
        sar.updated_at = Utc::now();
        Ok(sar.clone())
    }

    /// Reject the SAR back to draft for revisions
    pub async fn reject_sar(
        &self,
        sar_id: Uuid,
        approver_id: &str,
        approver_role: &str,
        reason: &str,
    ) -> LifecycleResult<Sar> {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if sar.status != SarStatus::PendingReview {
            return Err(LifecycleError::invalid("SAR is not pending review"));
        }

        sar.approvals.push(SarApproval {
            approval_id: Uuid::new_v4(),
            approver_id: approver_id.to_string(),
            approver_name: approver_id.to_string(),
            approver_role: approver_role.to_string(),
            decision: ApprovalDecision::Rejected,
            comments: Some(reason.to_string()),
            decided_at: Utc::now(),
        });
        sar.status = SarStatus::Draft;
        sar.updated_at = Utc::now();
        Ok(sar.clone())
    }

    /// File the approved SAR; assigns a BSA tracking id
    pub async fn file_sar(&self, sar_id: Uuid, method: &str) -> LifecycleResult<Sar> {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if sar.status != SarStatus::Approved {
            return Err(LifecycleError::invalid(
                "SAR must be approved before filing",
            ));
        }

        let now = Utc::now();
        let tracking: u64 = rand::thread_rng().gen();
        sar.submissions.push(SarSubmission {
            submission_id: Uuid::new_v4(),
            submission_date: now,
            submission_method: method.to_string(),
            bsa_id: format!("BSA-{tracking:012X}"),
            acknowledgment_number: None,
        });
        sar.status = SarStatus::Submitted;
        sar.submitted_at = Some(now);
        sar.updated_at = now;
        info!(number = %sar.sar_number, method, "SAR filed");
        Ok(sar.clone())
    }

    /// Record the regulator's acknowledgment
    pub async fn acknowledge_sar(
        &self,
        sar_id: Uuid,
        acknowledgment_number: &str,
    ) -> LifecycleResult<Sar> {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if sar.status != SarStatus::Submitted {
            return Err(LifecycleError::invalid("SAR has not been submitted"));
        }
        if let Some(submission) = sar.submissions.last_mut() {
            submission.acknowledgment_number = Some(acknowledgment_number.to_string());
        }
        sar.status = SarStatus::Acknowledged;
        sar.updated_at = Utc::now();
        Ok(sar.clone())
    }

    /// Amend a SAR: the original is marked amended and a corrected SAR
    /// referencing its number is opened
    pub async fn amend_sar(&self, sar_id: Uuid, prepared_by: &str) -> LifecycleResult<Sar> {
        let prior_number = {
            let mut sars = self.sars.write().await;
            let sar = sars
                .get_mut(&sar_id)
                .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
            sar.status = SarStatus::Amended;
            sar.updated_at = Utc::now();
            sar.sar_number.clone()
        };

        self.create_sar(
            CreateSar {
                sar_type: SarType::Corrected,
                primary_activity_type: SuspiciousActivityType::Other,
                prior_sar_number: Some(prior_number),
                case_ids: Vec::new(),
                alert_ids: Vec::new(),
            },
            prepared_by,
        )
        .await
    }

    /// Extend the filing deadline
    pub async fn request_extension(
        &self,
        sar_id: Uuid,
        reason: &str,
        new_deadline: DateTime<Utc>,
    ) -> LifecycleResult<Sar> {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if new_deadline <= sar.effective_deadline() {
            return Err(LifecycleError::invalid(
                "new deadline must extend the current deadline",
            ));
        }
        sar.extension_granted = true;
        sar.extension_reason = Some(reason.to_string());
        sar.extended_deadline = Some(new_deadline);
        sar.updated_at = Utc::now();
        Ok(sar.clone())
    }

    /// Aggregate statistics
    pub async fn get_statistics(&self) -> SarStatistics {
        let now = Utc::now();
        let month_start = now
            .date_naive()
            .with_day(1)
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
            .unwrap_or(now);
        let year_start = now
            .date_naive()
            .with_ordinal(1)
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
            .unwrap_or(now);

        let sars = self.sars.read().await;
        let mut stats = SarStatistics {
            total_sars: sars.len(),
            ..Default::default()
        };
        for sar in sars.values() {
            *stats
                .by_status
                .entry(sar.status.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_activity_type
                .entry(sar.primary_activity_type.as_str().to_string())
                .or_insert(0) += 1;
            if let Some(submitted) = sar.submitted_at {
                if submitted >= month_start {
                    stats.filed_this_month += 1;
                }
                if submitted >= year_start {
                    stats.filed_this_year += 1;
                }
            }
            if matches!(
                sar.status,
                SarStatus::Draft | SarStatus::PendingReview | SarStatus::Approved
            ) {
                stats.pending_filing += 1;
                if sar.effective_deadline() < now {
                    stats.overdue += 1;
                }
            }
        }
        stats
    }

    async fn mutate_draft<F>(&self, sar_id: Uuid, mutate: F) -> LifecycleResult<Sar>
    where
        F: FnOnce(&mut Sar),
    {
        let mut sars = self.sars.write().await;
        let sar = sars
            .get_mut(&sar_id)
            .ok_or_else(|| LifecycleError::not_found("SAR".to_string(), sar_id.to_string()))?;
        if sar.status != SarStatus::Draft {
            return Err(LifecycleError::invalid(
                "SAR can only be edited while in draft",
            ));
        }
        mutate(sar);
        sar.updated_at = Utc::now();
        Ok(sar.clone())
    }
}

impl Default for SarService {
    fn default() -> Self {
        Self::new(SarConfig::default())
    }
}

fn compile_narrative(narratives: &[Narrative]) -> String {
    let by_section: HashMap<NarrativeSection, &str> = narratives
        .iter()
        .map(|n| (n.section, n.content.as_str()))
        .collect();
    NarrativeSection::ORDER
        .iter()
        .filter_map(|section| {
            by_section.get(section).map(|content| {
                format!("[{}]\n{}", section.as_str().to_uppercase(), content)
            })
        })
        .collect::<Vec<String>>()
        .join("\n\n")
}
