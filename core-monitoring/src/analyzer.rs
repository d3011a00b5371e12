// =====================================================================================
// File: core-monitoring/src/analyzer.rs
// Description: Batch pattern analysis over customer transaction sets
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    detectors::PatternDetector,
    error::{MonitoringError, MonitoringResult},
    types::{AnalysisRequest, AnalysisResult, AnalysisStatus, CustomerBatch, DetectedPattern},
};

/// Accumulated progress of one analysis run
#[derive(Debug, Default)]
struct AnalysisProgress {
    patterns: Vec<DetectedPattern>,
    customers_analyzed: usize,
    transactions_analyzed: usize,
    detectors_executed: usize,
    errors: usize,
}

/// Runs the batch detectors over per-customer transaction sets.
///
/// Each customer is an independent task on a bounded worker pool
/// (`batch_concurrency` wide, default 4). The cancellation flag is checked
/// before each customer starts; a cancelled run returns partial results.
/// Detector failures are counted per customer and never abort the run.
pub struct BatchAnalyzer {
    detector: Arc<PatternDetector>,
    results: RwLock<HashMap<Uuid, AnalysisResult>>,
    cancel_flags: RwLock<HashMap<Uuid, Arc<AtomicBool>>>,
}

impl BatchAnalyzer {
    pub fn new(detector: Arc<PatternDetector>) -> Self {
        Self {
            detector,
            results: RwLock::new(HashMap::new()),
            cancel_flags: RwLock::new(HashMap::new()),
        }
    }

    /// Run the full detector suite for one analysis request
    pub async fn run_batch_analysis(&self, request: AnalysisRequest) -> AnalysisResult {
        let started = std::time::Instant::now();
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .write()
            .await
            .insert(request.request_id, cancel.clone());

        let progress = Mutex::new(AnalysisProgress::default());
        let concurrency = self.detector.config().batch_concurrency;

        stream::iter(&request.customers)
            .for_each_concurrent(concurrency, |batch| {
                let cancel = cancel.clone();
                let progress = &progress;
                async move {
                    if cancel.load(Ordering::SeqCst) {
                        return;
                    }
                    let (found, detectors_executed, errors) = self.analyze_customer(batch);
                    let mut progress = progress.lock().await;
                    progress.customers_analyzed += 1;
                    progress.transactions_analyzed += batch.transactions.len();
                    progress.detectors_executed += detectors_executed;
                    progress.errors += errors;
                    progress.patterns.extend(found);
                }
            })
            .await;

        let cancelled = cancel.load(Ordering::SeqCst);
        let progress = progress.into_inner();
        let result = AnalysisResult {
            result_id: Uuid::new_v4(),
            request_id: request.request_id,
            status: if cancelled {
                AnalysisStatus::Cancelled
            } else {
                AnalysisStatus::Completed
            },
            customers_analyzed: progress.customers_analyzed,
            transactions_analyzed: progress.transactions_analyzed,
            detectors_executed: progress.detectors_executed,
            patterns: progress.patterns,
            errors: progress.errors,
            analysis_date: Utc::now(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            request = %request.request_id,
            customers = result.customers_analyzed,
            patterns = result.patterns.len(),
            cancelled,
            "batch analysis finished"
        );

        self.results
            .write()
            .await
            .insert(result.result_id, result.clone());
        self.cancel_flags.write().await.remove(&request.request_id);
        result
    }

    /// Run every detector for one customer batch, counting failures
    fn analyze_customer(&self, batch: &CustomerBatch) -> (Vec<DetectedPattern>, usize, usize) {
        let runs: Vec<MonitoringResult<Vec<DetectedPattern>>> = vec![
            self.detector
                .detect_structuring(&batch.customer_id, &batch.transactions)
                .map(|p| p.into_iter().collect()),
            self.detector.detect_layering(&batch.transactions),
            self.detector.detect_round_tripping(&batch.transactions),
            self.detector.detect_cycles(&batch.transactions),
            self.detector
                .detect_rapid_movement(&batch.customer_id, &batch.transactions),
        ];

        let mut patterns = Vec::new();
        let mut detectors_executed = 0;
        let mut errors = 0;
        for run in runs {
            detectors_executed += 1;
            match run {
                Ok(found) => patterns.extend(found),
                Err(err) => {
                    warn!(customer = %batch.customer_id, error = %err, "detector failed");
                    errors += 1;
                }
            }
        }
        (patterns, detectors_executed, errors)
    }

    /// Signal a running analysis to stop after the in-flight customers
    pub async fn cancel_analysis(&self, request_id: Uuid) -> MonitoringResult<()> {
        let flags = self.cancel_flags.read().await;
        let flag = flags.get(&request_id).ok_or_else(|| {
            MonitoringError::not_found("analysis".to_string(), request_id.to_string())
        })?;
        flag.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Fetch a stored analysis result
    pub async fn get_result(&self, result_id: Uuid) -> Option<AnalysisResult> {
        self.results.read().await.get(&result_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::DetectorConfig;
    use crate::rules::RuleRegistry;
    use crate::types::{Transaction, TransactionChannel, TransactionDirection};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn analyzer() -> BatchAnalyzer {
        let detector =
            PatternDetector::new(DetectorConfig::default(), Arc::new(RuleRegistry::new())).unwrap();
        BatchAnalyzer::new(Arc::new(detector))
    }

    fn cash(customer: &str, amount: rust_decimal::Decimal, minutes: i64) -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            customer_id: customer.to_string(),
            account_id: format!("{customer}-acct"),
            direction: TransactionDirection::Credit,
            amount,
            currency: "USD".to_string(),
            channel: TransactionChannel::Cash,
            source_account: None,
            target_account: None,
            counterparty_name: None,
            counterparty_country: None,
            timestamp: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn test_analysis_detects_structuring_batch() {
        let analyzer = analyzer();
        let batch = CustomerBatch {
            customer_id: "C1".to_string(),
            transactions: (0..5).map(|i| cash("C1", dec!(9500), i * 5)).collect(),
        };
        let request = AnalysisRequest::new(vec![batch], "scheduler");
        let result = analyzer.run_batch_analysis(request).await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(result.customers_analyzed, 1);
        assert_eq!(result.transactions_analyzed, 5);
        assert_eq!(result.errors, 0);
        assert!(result
            .patterns
            .iter()
            .any(|p| p.pattern_type == crate::types::PatternType::Structuring));
    }

    #[tokio::test]
    async fn test_analysis_covers_every_customer() {
        let analyzer = analyzer();
        let batches: Vec<CustomerBatch> = (0..10)
            .map(|i| CustomerBatch {
                customer_id: format!("C{i}"),
                transactions: vec![cash(&format!("C{i}"), dec!(100), 0)],
            })
            .collect();
        let result = analyzer
            .run_batch_analysis(AnalysisRequest::new(batches, "scheduler"))
            .await;

        assert_eq!(result.customers_analyzed, 10);
        assert_eq!(result.transactions_analyzed, 10);
        // Five detectors per customer.
        assert_eq!(result.detectors_executed, 50);
    }

    #[tokio::test]
    async fn test_analysis_result_is_stored() {
        let analyzer = analyzer();
        let request = AnalysisRequest::new(Vec::new(), "scheduler");
        let result = analyzer.run_batch_analysis(request).await;
        let stored = analyzer.get_result(result.result_id).await.unwrap();
        assert_eq!(stored.request_id, result.request_id);
        assert_eq!(stored.customers_analyzed, 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_analysis_not_found() {
        let analyzer = analyzer();
        let err = analyzer.cancel_analysis(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.category(), "not_found");
    }
}
