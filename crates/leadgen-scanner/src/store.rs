//! Job storage.

use crate::error::{Result, ScanError};
use crate::job::{Job, JobState};
use leadgen_core::JobId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage backend for jobs.
///
/// Implementations must refuse to overwrite a job that is already
/// `Completed` or `Failed`.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Returns `false` if a job with the same ID exists.
    async fn insert(&self, job: Job) -> Result<bool>;

    async fn get(&self, id: &JobId) -> Result<Option<Job>>;

    /// Replace the stored copy of an existing, non-terminal job.
    async fn put(&self, job: Job) -> Result<()>;

    /// All jobs, optionally filtered by state, oldest first.
    async fn list(&self, state: Option<JobState>) -> Result<Vec<Job>>;
}

/// Process-local job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job.id()) {
            return Ok(false);
        }
        jobs.insert(job.id().clone(), job);
        Ok(true)
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn put(&self, job: Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let existing = jobs.get(job.id()).ok_or_else(|| ScanError::NotFound {
            job_id: job.id().to_string(),
        })?;
        if existing.state().is_terminal() {
            return Err(ScanError::JobFinalized {
                job_id: job.id().to_string(),
                state: existing.state(),
            });
        }
        jobs.insert(job.id().clone(), job);
        Ok(())
    }

    async fn list(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| state.map_or(true, |s| job.state() == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(matching)
    }
}
