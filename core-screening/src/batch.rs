// =====================================================================================
// File: core-screening/src/batch.rs
// Description: Batch screening jobs with bounded worker concurrency
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    engine::ScreeningEngine,
    error::ScreeningError,
    types::{BatchJobStatus, BatchScreeningJob, SanctionListType, ScreeningRequest},
};

impl ScreeningEngine {
    /// Start a batch screening job over the given subjects.
    ///
    /// The job runs on a bounded worker pool in the background; the returned
    /// snapshot is in `running` state. Progress counters update after each
    /// subject and the cancellation flag is checked before each subject
    /// starts. Per-subject failures are counted in `errors_count` and do not
    /// fail the job.
    pub async fn batch_screen(
        self: &Arc<Self>,
        subjects: Vec<ScreeningRequest>,
        job_name: &str,
        created_by: &str,
    ) -> BatchScreeningJob {
        let job = BatchScreeningJob {
            job_id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            status: BatchJobStatus::Running,
            total_entities: subjects.len(),
            entities_processed: 0,
            matches_found: 0,
            errors_count: 0,
            lists_to_screen: SanctionListType::all(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        };
        let job_id = job.job_id;

        // Seed the job record and its cancellation flag before the workers
        // start so get_job/cancel_job observe them immediately.
        self.jobs.write().await.insert(job_id, job.clone());
        self.cancel_flags
            .write()
            .await
            .insert(job_id, Arc::new(AtomicBool::new(false)));

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_batch(job_id, subjects).await;
        });

        info!(%job_id, job_name, "batch screening started");
        job
    }

    async fn run_batch(&self, job_id: Uuid, subjects: Vec<ScreeningRequest>) {
        let cancel = self
            .cancel_flags
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or_default();
        let concurrency = self.config().batch_concurrency;

        stream::iter(subjects)
            .for_each_concurrent(concurrency, |request| {
                let cancel = cancel.clone();
                async move {
                    if cancel.load(Ordering::SeqCst) {
                        return;
                    }
                    match self.screen(request).await {
                        Ok(result) => {
                            self.record_subject(job_id, result.match_count, false).await;
                        }
                        Err(err) => {
                            warn!(%job_id, error = %err, "batch subject failed");
                            self.record_subject(job_id, 0, true).await;
                        }
                    }
                }
            })
            .await;

        let cancelled = cancel.load(Ordering::SeqCst);
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = if cancelled {
                BatchJobStatus::Cancelled
            } else {
                BatchJobStatus::Completed
            };
            job.completed_at = Some(Utc::now());
            info!(
                %job_id,
                processed = job.entities_processed,
                matches = job.matches_found,
                errors = job.errors_count,
                cancelled,
                "batch screening finished"
            );
        }
    }

    async fn record_subject(&self, job_id: Uuid, matches: usize, errored: bool) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.entities_processed += 1;
            job.matches_found += matches;
            if errored {
                job.errors_count += 1;
            }
        }
    }

    /// Fetch a batch job snapshot
    pub async fn get_job(&self, job_id: Uuid) -> Option<BatchScreeningJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Signal a running job to stop after the in-flight subjects finish
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<(), ScreeningError> {
        let flags = self.cancel_flags.read().await;
        let flag = flags.get(&job_id).ok_or_else(|| {
            ScreeningError::not_found("batch job".to_string(), job_id.to_string())
        })?;
        flag.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Wait until a job leaves the running state, for callers that need the
    /// final counters
    pub async fn wait_for_job(&self, job_id: Uuid) -> Result<BatchScreeningJob, ScreeningError> {
        loop {
            let job = self.get_job(job_id).await.ok_or_else(|| {
                ScreeningError::not_found("batch job".to_string(), job_id.to_string())
            })?;
            if job.status != BatchJobStatus::Running && job.status != BatchJobStatus::Pending {
                return Ok(job);
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScreeningConfig;
    use crate::types::ScreenedEntityType;

    fn subjects(names: &[&str]) -> Vec<ScreeningRequest> {
        names
            .iter()
            .map(|n| ScreeningRequest::new(ScreenedEntityType::Individual, n, "batch"))
            .collect()
    }

    #[tokio::test]
    async fn test_batch_screen_processes_all_subjects() {
        let engine = Arc::new(ScreeningEngine::new(ScreeningConfig::default()).unwrap());
        engine.load_entries(ScreeningEngine::builtin_entries());

        let job = engine
            .batch_screen(
                subjects(&["John Smith Doe", "Unrelated One", "Evil Corp Ltd", "Nobody Here"]),
                "nightly",
                "scheduler",
            )
            .await;
        let done = engine.wait_for_job(job.job_id).await.unwrap();

        assert_eq!(done.status, BatchJobStatus::Completed);
        assert_eq!(done.entities_processed, 4);
        assert!(done.matches_found >= 2);
        assert_eq!(done.errors_count, 0);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_batch_counts_subject_errors_without_failing() {
        let engine = Arc::new(ScreeningEngine::new(ScreeningConfig::default()).unwrap());
        engine.load_entries(ScreeningEngine::builtin_entries());

        let mut bad = ScreeningRequest::new(ScreenedEntityType::Individual, "Someone", "batch");
        bad.match_threshold = 5.0;
        let mut all = subjects(&["John Smith Doe"]);
        all.push(bad);

        let job = engine.batch_screen(all, "with-errors", "scheduler").await;
        let done = engine.wait_for_job(job.job_id).await.unwrap();

        assert_eq!(done.status, BatchJobStatus::Completed);
        assert_eq!(done.entities_processed, 2);
        assert_eq!(done.errors_count, 1);
    }

    #[tokio::test]
    async fn test_cancelled_job_reports_partial_counters() {
        let engine = Arc::new(ScreeningEngine::new(ScreeningConfig::default()).unwrap());
        engine.load_entries(ScreeningEngine::builtin_entries());

        let many: Vec<ScreeningRequest> = (0..200)
            .map(|i| {
                ScreeningRequest::new(
                    ScreenedEntityType::Individual,
                    &format!("Subject Number {i}"),
                    "batch",
                )
            })
            .collect();

        let job = engine.batch_screen(many, "cancellable", "scheduler").await;
        engine.cancel_job(job.job_id).await.unwrap();
        let done = engine.wait_for_job(job.job_id).await.unwrap();

        assert_eq!(done.status, BatchJobStatus::Cancelled);
        assert!(done.entities_processed <= done.total_entities);
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_is_not_found() {
        let engine = Arc::new(ScreeningEngine::new(ScreeningConfig::default()).unwrap());
        let err = engine.cancel_job(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.category(), "not_found");
    }
}
