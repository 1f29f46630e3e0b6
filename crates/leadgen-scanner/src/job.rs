//! Job model and lifecycle state machine.

use crate::contact::Contact;
use crate::error::{Result, ScanError};
use leadgen_core::{JobId, Timestamp};
use leadgen_fetch::FetchErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest accepted `target_count`.
pub const MAX_TARGET_COUNT: u32 = 100;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// `Queued -> Failed` is only used for cancelling a job that never ran.
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processing | Self::Failed)
                | (Self::Processing, Self::Processing | Self::Completed | Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobErrorKind {
    Timeout,
    RateLimited,
    NetworkError,
    ClientError,
    ServerError,
    Exhausted,
    Cancelled,
}

impl From<FetchErrorKind> for JobErrorKind {
    fn from(kind: FetchErrorKind) -> Self {
        match kind {
            FetchErrorKind::Timeout => Self::Timeout,
            FetchErrorKind::RateLimited => Self::RateLimited,
            FetchErrorKind::NetworkError => Self::NetworkError,
            FetchErrorKind::NotFound | FetchErrorKind::ClientError => Self::ClientError,
            FetchErrorKind::ServerError => Self::ServerError,
        }
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(JobErrorKind::Cancelled, "job was cancelled")
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for JobError {}

/// Counters exposed to pollers while a job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub search_pages: u32,
    pub candidates_found: u32,
    pub pages_fetched: u32,
    pub fetch_failures: u32,
}

/// A lead-generation job.
///
/// Fields are read-only from outside the crate; all mutation goes through
/// methods that enforce the state machine and refuse to touch a job that
/// has reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    query: String,
    location: String,
    target_count: u32,
    state: JobState,
    results: Vec<Contact>,
    error: Option<JobError>,
    progress: JobProgress,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Job {
    pub fn new(
        id: JobId,
        query: impl Into<String>,
        location: impl Into<String>,
        target_count: u32,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            query: query.into(),
            location: location.into(),
            target_count,
            state: JobState::Queued,
            results: Vec::new(),
            error: None,
            progress: JobProgress::default(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn results(&self) -> &[Contact] {
        &self.results
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    pub fn progress(&self) -> JobProgress {
        self.progress
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Dispatch to a worker.
    pub fn start(&mut self) -> Result<()> {
        if self.state != JobState::Queued {
            return Err(self.invalid(JobState::Processing));
        }
        self.transition(JobState::Processing)
    }

    /// Record the current result set and counters.
    pub fn record(&mut self, results: &[Contact], progress: JobProgress) -> Result<()> {
        self.transition(JobState::Processing)?;
        self.results = results.to_vec();
        self.progress = progress;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(JobState::Completed)
    }

    /// Fail the job. A queued job may only fail through cancellation.
    pub fn fail(&mut self, error: JobError) -> Result<()> {
        if self.state == JobState::Queued && error.kind != JobErrorKind::Cancelled {
            return Err(self.invalid(JobState::Failed));
        }
        self.transition(JobState::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    pub fn summary(&self, poll_interval_secs: u64) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            query: self.query.clone(),
            location: self.location.clone(),
            target_count: self.target_count,
            state: self.state,
            result_count: self.results.len(),
            progress: self.progress,
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            poll_after_secs: (!self.state.is_terminal()).then_some(poll_interval_secs),
        }
    }

    fn transition(&mut self, to: JobState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(ScanError::JobFinalized {
                job_id: self.id.to_string(),
                state: self.state,
            });
        }
        if !self.state.can_transition_to(to) {
            return Err(self.invalid(to));
        }
        self.state = to;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn invalid(&self, to: JobState) -> ScanError {
        ScanError::InvalidTransition {
            job_id: self.id.to_string(),
            from: self.state,
            to,
        }
    }
}

/// Lightweight view of a job for listings and polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub query: String,
    pub location: String,
    pub target_count: u32,
    pub state: JobState,
    pub result_count: usize,
    pub progress: JobProgress,
    pub error: Option<JobError>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Suggested delay before the next poll; `None` once the job is finished.
    pub poll_after_secs: Option<u64>,
}

/// `target_count` must be a positive multiple of 10, at most [`MAX_TARGET_COUNT`].
pub fn validate_target_count(target_count: u32) -> Result<()> {
    if target_count == 0 || target_count % 10 != 0 || target_count > MAX_TARGET_COUNT {
        return Err(ScanError::Validation(format!(
            "target_count must be a positive multiple of 10 no greater than {MAX_TARGET_COUNT}, got {target_count}"
        )));
    }
    Ok(())
}
