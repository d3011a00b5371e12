// =====================================================================================
// File: service-aml/src/lib.rs
// Description: Composition root for the ClearLedger AML analytical core
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! # AML Service Module
//!
//! Owns one instance of every analytical subsystem and wires the
//! cross-cutting flows: realtime monitoring into alert creation, screening
//! verdicts into sanctions flags and notifications, and SAR filing back
//! into the linked alerts and cases. The HTTP surface, persistence, and
//! document store are collaborators behind the exposed traits.

pub mod core;
pub mod error;
pub mod hooks;

// Re-export main types and traits
pub use crate::core::{AmlCore, AmlCoreConfig};
pub use error::{ServiceError, ServiceResult};
pub use hooks::{
    AuditLogger, AuditRecord, CriticalEvent, NotificationSink, RecordingHooks,
    TracingAuditLogger, TracingNotificationSink,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_independent_cores_do_not_share_state() {
        let a = AmlCore::new(AmlCoreConfig::default()).unwrap();
        let b = AmlCore::new(AmlCoreConfig::default()).unwrap();

        a.alerts()
            .create_alert(core_lifecycle::CreateAlert::new(
                core_lifecycle::AlertType::ManualReview,
                core_lifecycle::AlertSeverity::Low,
                "only in core a",
                "C1",
            ))
            .await
            .unwrap();

        assert_eq!(a.alerts().get_statistics().await.total_alerts, 1);
        assert_eq!(b.alerts().get_statistics().await.total_alerts, 0);
    }
}
