// =====================================================================================
// File: core-screening/src/watchlist.rs
// Description: Internal watchlist management and screening
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ScreeningError,
    matcher,
    types::{EntityIdentifier, ScreenedEntityType, ScreeningRequest},
};

/// Origin of a watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistType {
    Internal,
    External,
}

/// Why entries land on a watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistCategory {
    HighRisk,
    Exited,
    Fraud,
    DoNotOnboard,
    Pep,
    Other,
}

/// Risk level carried by a watchlist entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistRiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A named watchlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watchlist {
    pub watchlist_id: Uuid,
    pub watchlist_name: String,
    pub watchlist_code: String,
    pub watchlist_type: WatchlistType,
    pub description: String,
    pub default_category: WatchlistCategory,
    pub owner_team: String,
    pub include_in_screening: bool,
    pub alert_severity: Option<WatchlistRiskLevel>,
    pub entry_count: usize,
    pub active_entry_count: usize,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Watchlist {
    pub fn new(
        name: &str,
        code: &str,
        watchlist_type: WatchlistType,
        description: &str,
        default_category: WatchlistCategory,
        owner_team: &str,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            watchlist_id: Uuid::new_v4(),
            watchlist_name: name.to_string(),
            watchlist_code: code.to_string(),
            watchlist_type,
            description: description.to_string(),
            default_category,
            owner_team: owner_team.to_string(),
            include_in_screening: true,
            alert_severity: None,
            entry_count: 0,
            active_entry_count: 0,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Entry on a watchlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub entry_id: Uuid,
    pub watchlist_id: Uuid,
    pub entity_type: ScreenedEntityType,
    pub primary_name: String,
    pub aliases: Vec<String>,
    pub identifiers: Vec<EntityIdentifier>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationalities: Vec<String>,
    pub category: WatchlistCategory,
    pub risk_level: WatchlistRiskLevel,
    pub reason: String,
    pub source: String,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Match against a watchlist entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistMatch {
    pub match_id: Uuid,
    pub entry_id: Uuid,
    pub watchlist_id: Uuid,
    pub watchlist_code: String,
    pub match_score: f64,
    pub name_match_score: f64,
    pub identifier_matched: bool,
    pub matched_name: String,
    pub category: WatchlistCategory,
    pub risk_level: WatchlistRiskLevel,
}

/// Append-only audit record for watchlist mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistAuditEntry {
    pub log_id: Uuid,
    pub watchlist_id: Uuid,
    pub entry_id: Option<Uuid>,
    pub action: String,
    pub details: String,
    pub actor: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Watchlist statistics snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchlistStatistics {
    pub total_watchlists: usize,
    pub total_entries: usize,
    pub active_entries: usize,
    pub by_category: HashMap<String, usize>,
}

/// Watchlist management and screening service
pub struct WatchlistService {
    watchlists: RwLock<HashMap<Uuid, Watchlist>>,
    entries: RwLock<HashMap<Uuid, WatchlistEntry>>,
    audit_log: RwLock<Vec<WatchlistAuditEntry>>,
}

impl WatchlistService {
    /// Create the service with the standard internal watchlists seeded
    pub fn new() -> Self {
        let mut watchlists = HashMap::new();
        for (name, code, description, category, team, severity) in [
            (
                "High Risk Customers",
                "HIGH_RISK",
                "Customers identified as high risk requiring enhanced monitoring",
                WatchlistCategory::HighRisk,
                "compliance",
                None,
            ),
            (
                "Exited Customers",
                "EXITED",
                "Customers who have been exited for compliance reasons",
                WatchlistCategory::Exited,
                "compliance",
                None,
            ),
            (
                "Fraud Watch",
                "FRAUD_WATCH",
                "Entities with suspected or confirmed fraud involvement",
                WatchlistCategory::Fraud,
                "fraud_team",
                Some(WatchlistRiskLevel::Critical),
            ),
            (
                "Do Not Onboard",
                "DNO",
                "Entities that should not be onboarded as customers",
                WatchlistCategory::DoNotOnboard,
                "compliance",
                Some(WatchlistRiskLevel::Critical),
            ),
        ] {
            let mut watchlist = Watchlist::new(
                name,
                code,
                WatchlistType::Internal,
                description,
                category,
                team,
                "system",
            );
            watchlist.alert_severity = severity;
            watchlists.insert(watchlist.watchlist_id, watchlist);
        }

        Self {
            watchlists: RwLock::new(watchlists),
            entries: RwLock::new(HashMap::new()),
            audit_log: RwLock::new(Vec::new()),
        }
    }

    /// Create an additional watchlist
    pub async fn create_watchlist(&self, watchlist: Watchlist) -> Result<Watchlist, ScreeningError> {
        let mut watchlists = self.watchlists.write().await;
        if watchlists
            .values()
            .any(|w| w.watchlist_code == watchlist.watchlist_code)
        {
            return Err(ScreeningError::conflict(format!(
                "watchlist code already exists: {}",
                watchlist.watchlist_code
            )));
        }
        watchlists.insert(watchlist.watchlist_id, watchlist.clone());
        drop(watchlists);

        self.log_audit(
            watchlist.watchlist_id,
            None,
            "create",
            &format!("Watchlist '{}' created", watchlist.watchlist_name),
            &watchlist.created_by,
            None,
            None,
        )
        .await;
        Ok(watchlist)
    }

    pub async fn get_watchlist(&self, watchlist_id: Uuid) -> Option<Watchlist> {
        self.watchlists.read().await.get(&watchlist_id).cloned()
    }

    pub async fn get_watchlist_by_code(&self, code: &str) -> Option<Watchlist> {
        self.watchlists
            .read()
            .await
            .values()
            .find(|w| w.watchlist_code == code)
            .cloned()
    }

    pub async fn all_watchlists(&self) -> Vec<Watchlist> {
        self.watchlists.read().await.values().cloned().collect()
    }

    /// Add an entry to a watchlist
    pub async fn add_entry(
        &self,
        watchlist_id: Uuid,
        mut entry: WatchlistEntry,
    ) -> Result<WatchlistEntry, ScreeningError> {
        let mut watchlists = self.watchlists.write().await;
        let watchlist = watchlists.get_mut(&watchlist_id).ok_or_else(|| {
            ScreeningError::not_found("watchlist".to_string(), watchlist_id.to_string())
        })?;
        if entry.primary_name.trim().is_empty() {
            return Err(ScreeningError::invalid("primary_name must not be empty"));
        }

        entry.watchlist_id = watchlist_id;
        watchlist.entry_count += 1;
        if entry.is_active {
            watchlist.active_entry_count += 1;
        }
        watchlist.updated_at = Utc::now();
        drop(watchlists);

        self.entries.write().await.insert(entry.entry_id, entry.clone());
        self.log_audit(
            watchlist_id,
            Some(entry.entry_id),
            "create",
            &format!("Entry '{}' added", entry.primary_name),
            &entry.created_by,
            None,
            serde_json::to_value(&entry).ok(),
        )
        .await;

        info!(watchlist = %watchlist_id, entry = %entry.primary_name, "watchlist entry added");
        Ok(entry)
    }

    pub async fn get_entry(&self, entry_id: Uuid) -> Option<WatchlistEntry> {
        self.entries.read().await.get(&entry_id).cloned()
    }

    /// Deactivate a watchlist entry
    pub async fn deactivate_entry(
        &self,
        entry_id: Uuid,
        actor: &str,
    ) -> Result<WatchlistEntry, ScreeningError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&entry_id).ok_or_else(|| {
            ScreeningError::not_found("watchlist entry".to_string(), entry_id.to_string())
        })?;
        if !entry.is_active {
            return Err(ScreeningError::invalid("entry is already inactive"));
        }
        let before = serde_json::to_value(&*entry).ok();
        entry.is_active = false;
        entry.updated_by = Some(actor.to_string());
        entry.updated_at = Some(Utc::now());
        let entry = entry.clone();
        drop(entries);

        let mut watchlists = self.watchlists.write().await;
        if let Some(watchlist) = watchlists.get_mut(&entry.watchlist_id) {
            watchlist.active_entry_count = watchlist.active_entry_count.saturating_sub(1);
            watchlist.updated_at = Utc::now();
        }
        drop(watchlists);

        self.log_audit(
            entry.watchlist_id,
            Some(entry_id),
            "deactivate",
            &format!("Entry '{}' deactivated", entry.primary_name),
            actor,
            before,
            serde_json::to_value(&entry).ok(),
        )
        .await;
        Ok(entry)
    }

    /// Screen one subject against every watchlist included in screening
    pub async fn screen(&self, request: &ScreeningRequest) -> Vec<WatchlistMatch> {
        let watchlists = self.watchlists.read().await;
        let entries = self.entries.read().await;

        let mut matches: Vec<WatchlistMatch> = entries
            .values()
            .filter(|entry| entry.is_active)
            .filter(|entry| {
                watchlists
                    .get(&entry.watchlist_id)
                    .map(|w| w.include_in_screening)
                    .unwrap_or(false)
            })
            .filter_map(|entry| {
                let name_score = request
                    .all_names()
                    .flat_map(|req_name| {
                        std::iter::once(entry.primary_name.as_str())
                            .chain(entry.aliases.iter().map(String::as_str))
                            .map(move |n| matcher::name_similarity(req_name, n))
                    })
                    .fold(0.0_f64, f64::max);

                let identifier_matched = request.identifiers.iter().any(|req_id| {
                    entry.identifiers.iter().any(|entry_id| {
                        matcher::identifier_match(&req_id.as_fields(), &entry_id.as_fields())
                    })
                });

                let score = if identifier_matched { 1.0 } else { name_score };
                if score < request.match_threshold {
                    return None;
                }

                let watchlist = watchlists.get(&entry.watchlist_id)?;
                Some(WatchlistMatch {
                    match_id: Uuid::new_v4(),
                    entry_id: entry.entry_id,
                    watchlist_id: entry.watchlist_id,
                    watchlist_code: watchlist.watchlist_code.clone(),
                    match_score: score,
                    name_match_score: name_score,
                    identifier_matched,
                    matched_name: entry.primary_name.clone(),
                    category: entry.category,
                    risk_level: entry.risk_level,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        matches
    }

    /// Append-only audit trail
    pub async fn audit_log(&self) -> Vec<WatchlistAuditEntry> {
        self.audit_log.read().await.clone()
    }

    pub async fn statistics(&self) -> WatchlistStatistics {
        let mut stats = WatchlistStatistics {
            total_watchlists: self.watchlists.read().await.len(),
            ..Default::default()
        };
        for entry in self.entries.read().await.values() {
            stats.total_entries += 1;
            if entry.is_active {
                stats.active_entries += 1;
            }
            *stats
                .by_category
                .entry(format!("{:?}", entry.category).to_lowercase())
                .or_insert(0) += 1;
        }
        stats
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_audit(
        &self,
        watchlist_id: Uuid,
        entry_id: Option<Uuid>,
        action: &str,
        details: &str,
        actor: &str,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) {
        self.audit_log.write().await.push(WatchlistAuditEntry {
            log_id: Uuid::new_v4(),
            watchlist_id,
            entry_id,
            action: action.to_string(),
            details: details.to_string(),
            actor: actor.to_string(),
            before,
            after,
            timestamp: Utc::now(),
        });
    }
}

impl Default for WatchlistService {
    fn default() -> Self {
        Self::new()
    }
}
