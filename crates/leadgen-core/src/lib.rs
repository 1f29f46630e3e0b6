//! LeadGen Core - Foundation crate for the LeadGen contact discovery pipeline.
//!
//! This crate provides shared types, error handling and configuration
//! management that the fetch and scanner crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`JobId`, `Timestamp`) and normalization helpers
//!
//! # Example
//!
//! ```rust
//! use leadgen_core::{AppConfig, JobId, Timestamp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.jobs.per_job_concurrency, 5);
//!
//! let id = JobId::derive("plumbers", "boston", &Timestamp::now());
//! assert!(id.as_str().starts_with("plumbers_boston_"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, ExtractionConfig, FetchConfig, JobsConfig, RateLimitConfig, RetryConfig,
    SearchConfig,
};
pub use error::{ConfigError, ConfigResult, LeadgenError, Result};
pub use types::{normalize_term, slugify, JobId, Timestamp};
