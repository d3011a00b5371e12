// =====================================================================================
// File: core-resolution/src/jobs.rs
// Description: Batch resolution jobs over pending source records
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ResolutionError, ResolutionResult},
    service::EntityResolver,
};

/// Progress status of a resolution job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionJobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
}

/// Batch resolution job with progress counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionJob {
    pub job_id: Uuid,
    pub job_name: String,
    pub status: ResolutionJobStatus,
    pub total_records: usize,
    pub processed_records: usize,
    pub auto_resolved: usize,
    pub pending_review: usize,
    pub errors: usize,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EntityResolver {
    /// Resolve every pending source record in the background.
    ///
    /// Each record is an independent task on a bounded worker pool
    /// (`job_concurrency` wide, default 4); records contending on the same
    /// master entity serialize on its lock. The cancellation flag is
    /// checked before each record starts, and per-record failures are
    /// counted without stopping the job.
    pub async fn run_resolution_job(
        self: &Arc<Self>,
        job_name: &str,
        created_by: &str,
    ) -> ResolutionJob {
        let pending = self.pending_record_ids().await;
        let job = ResolutionJob {
            job_id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            status: ResolutionJobStatus::Running,
            total_records: pending.len(),
            processed_records: 0,
            auto_resolved: 0,
            pending_review: 0,
            errors: 0,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        };
        let job_id = job.job_id;

        self.jobs.write().await.insert(job_id, job.clone());
        self.cancel_flags
            .write()
            .await
            .insert(job_id, Arc::new(AtomicBool::new(false)));

        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            resolver.run_job_inner(job_id, pending).await;
        });

        info!(%job_id, job_name, "resolution job started");
        job
    }

    async fn run_job_inner(&self, job_id: Uuid, pending: Vec<String>) {
        let cancel = self
            .cancel_flags
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or_default();
        let concurrency = self.config().job_concurrency;

        stream::iter(pending)
            .for_each_concurrent(concurrency, |record_id| {
                let cancel = cancel.clone();
                async move {
                    if cancel.load(Ordering::SeqCst) {
                        return;
                    }
                    let outcome = self.resolve_record(&record_id).await;
                    let mut jobs = self.jobs.write().await;
                    let Some(job) = jobs.get_mut(&job_id) else {
                        return;
                    };
                    job.processed_records += 1;
                    match outcome {
                        Ok((Some(_), _)) => job.auto_resolved += 1,
                        Ok((None, _)) => job.pending_review += 1,
                        Err(err) => {
                            warn!(%job_id, record = %record_id, error = %err, "record resolution failed");
                            job.errors += 1;
                        }
                    }
                }
            })
            .await;

        let cancelled = cancel.load(Ordering::SeqCst);
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = if cancelled {
                ResolutionJobStatus::Cancelled
            } else {
                ResolutionJobStatus::Completed
            };
            job.completed_at = Some(Utc::now());
            info!(
                %job_id,
                processed = job.processed_records,
                auto_resolved = job.auto_resolved,
                pending_review = job.pending_review,
                errors = job.errors,
                cancelled,
                "resolution job finished"
            );
        }
    }

    pub async fn get_job(&self, job_id: Uuid) -> Option<ResolutionJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Signal a running job to stop after the current record
    pub async fn cancel_job(&self, job_id: Uuid) -> ResolutionResult<()> {
        let flags = self.cancel_flags.read().await;
        let flag = flags.get(&job_id).ok_or_else(|| {
            ResolutionError::not_found("resolution job".to_string(), job_id.to_string())
        })?;
        flag.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Wait for a job to leave the running state
    pub async fn wait_for_job(&self, job_id: Uuid) -> ResolutionResult<ResolutionJob> {
        loop {
            let job = self.get_job(job_id).await.ok_or_else(|| {
                ResolutionError::not_found("resolution job".to_string(), job_id.to_string())
            })?;
            if job.status != ResolutionJobStatus::Running
                && job.status != ResolutionJobStatus::Pending
            {
                return Ok(job);
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}
