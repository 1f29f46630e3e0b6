use crate::job::{JobError, JobState};
use leadgen_fetch::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("job not found: {job_id}")]
    NotFound { job_id: String },

    #[error("job {job_id} is not ready (state: {state})")]
    NotReady { job_id: String, state: JobState },

    #[error("job {job_id} failed: {error}")]
    JobFailed { job_id: String, error: JobError },

    #[error("job {job_id} already finished (state: {state})")]
    AlreadyFinished { job_id: String, state: JobState },

    #[error("invalid job transition for {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobState,
        to: JobState,
    },

    #[error("job {job_id} is {state} and can no longer be modified")]
    JobFinalized { job_id: String, state: JobState },

    #[error("fetcher setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
