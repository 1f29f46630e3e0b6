//! Leadgen Scanner - lead-generation job pipeline.
//!
//! This crate turns a (query, location, target count) request into a
//! deduplicated list of business contacts. It plans search-result pages,
//! fetches candidate business pages through the shared rate-limited
//! fetcher, mines emails and phone numbers from them, and drives each job
//! through its lifecycle.
//!
//! # Features
//!
//! - Bounded worker pool with per-job fetch concurrency
//! - Search pagination with redirect unwrapping and a domain denylist
//! - Email and North American phone extraction from visible page text
//! - Identity-merging deduplication that preserves discovery order
//! - Cancellation and an overall time budget per job
//!
//! # Example
//!
//! ```rust,ignore
//! use leadgen_core::AppConfig;
//! use leadgen_scanner::JobOrchestrator;
//!
//! let orchestrator = JobOrchestrator::from_config(AppConfig::load_with_env()?)?;
//! let job_id = orchestrator.submit("plumbers", "boston", 20).await?;
//! let job = orchestrator.wait_for(&job_id).await?;
//! let contacts = orchestrator.results(&job_id).await?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod contact;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod job;
pub mod orchestrator;
pub mod planner;
pub mod store;

// Re-export commonly used types
pub use contact::Contact;
pub use dedup::{ContactSet, InsertOutcome};
pub use error::{Result, ScanError};
pub use extractor::{find_emails, find_phones, normalize_phone, ContactExtractor};
pub use filter::DomainFilter;
pub use job::{
    validate_target_count, Job, JobError, JobErrorKind, JobProgress, JobState, JobSummary,
    MAX_TARGET_COUNT,
};
pub use orchestrator::JobOrchestrator;
pub use planner::{Candidate, CandidateParser, SearchPage, SearchPlanner};
pub use store::{InMemoryJobStore, JobStore};
