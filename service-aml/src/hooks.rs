// =====================================================================================
// File: service-aml/src/hooks.rs
// Description: Collaborator contracts: audit logging and critical notifications
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

/// One append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: String,
    pub action: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}

impl AuditRecord {
    pub fn new(actor: &str, action: &str, target: &str) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            target: target.to_string(),
            timestamp: Utc::now(),
            before: None,
            after: None,
        }
    }
}

/// Append-only audit sink; the real implementation lives outside the core
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// Critical event pushed to the notification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalEvent {
    pub event_type: String,
    pub subject_id: String,
    pub summary: String,
    pub occurred_at: DateTime<Utc>,
}

impl CriticalEvent {
    pub fn new(event_type: &str, subject_id: &str, summary: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            subject_id: subject_id.to_string(),
            summary: summary.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Sink for critical-severity events (sanctions hits, new fraud alerts)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: CriticalEvent);
}

/// Default audit logger that writes structured log lines
#[derive(Debug, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn record(&self, record: AuditRecord) {
        info!(
            actor = %record.actor,
            action = %record.action,
            target = %record.target,
            "audit"
        );
    }
}

/// Default notification sink that writes structured log lines
#[derive(Debug, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, event: CriticalEvent) {
        info!(
            event = %event.event_type,
            subject = %event.subject_id,
            summary = %event.summary,
            "critical event"
        );
    }
}

/// In-memory recorder used by tests and local tooling
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub audit: Mutex<Vec<AuditRecord>>,
    pub events: Mutex<Vec<CriticalEvent>>,
}

#[async_trait]
impl AuditLogger for RecordingHooks {
    async fn record(&self, record: AuditRecord) {
        self.audit.lock().await.push(record);
    }
}

#[async_trait]
impl NotificationSink for RecordingHooks {
    async fn notify(&self, event: CriticalEvent) {
        self.events.lock().await.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_hooks_capture() {
        let hooks = RecordingHooks::default();
        hooks.record(AuditRecord::new("analyst1", "close_alert", "ALT-1")).await;
        hooks
            .notify(CriticalEvent::new("sanctions_hit", "C1", "exact list match"))
            .await;

        assert_eq!(hooks.audit.lock().await.len(), 1);
        assert_eq!(hooks.events.lock().await.len(), 1);
    }
}
