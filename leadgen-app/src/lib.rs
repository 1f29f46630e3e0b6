//! LeadGen application shell
//!
//! Thin shell that loads configuration, initializes logging and drives one
//! job through the orchestrator. Core logic lives in the `crates/` directory.

pub mod args;
pub mod commands;
pub mod error;
pub mod state;

use anyhow::Context;
use commands::jobs::{self, ContactResponse, SubmitJobRequest};
use leadgen_core::AppConfig;
use leadgen_scanner::{JobState, JobSummary};
use serde::Serialize;
use state::AppState;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Final output of a run: the job summary plus its contacts.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub job: JobSummary,
    pub contacts: Vec<ContactResponse>,
}

/// Initialize tracing subscriber for logging.
///
/// Logs go to stderr so stdout carries only the JSON report.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "info,leadgen=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load configuration from `path`, or from the default location when `None`.
///
/// `LEADGEN_*` environment overrides are applied either way.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config.validate().context("invalid configuration")?;
            config
        }
        None => AppConfig::load_with_env().context("failed to load configuration")?,
    };
    Ok(config)
}

/// Submit a job and poll it to completion.
///
/// If `shutdown` resolves first the job is cancelled and polled until it
/// reports its final state.
pub async fn run_job<F>(
    state: &AppState,
    request: SubmitJobRequest,
    shutdown: F,
) -> anyhow::Result<JobReport>
where
    F: Future<Output = ()>,
{
    let submitted = jobs::submit_job(state, request).await?;
    let job_id = submitted.job_id;
    info!("Job {} submitted", job_id);

    tokio::pin!(shutdown);
    let mut cancelled = false;

    let summary = loop {
        let summary = jobs::get_job(state, &job_id).await?;
        let Some(poll_after) = summary.poll_after_secs else {
            break summary;
        };
        info!(
            state = %summary.state,
            contacts = summary.result_count,
            pages = summary.progress.pages_fetched,
            failures = summary.progress.fetch_failures,
            "Job {} in progress",
            job_id
        );

        let wait = tokio::time::sleep(Duration::from_secs(poll_after.max(1)));
        if cancelled {
            wait.await;
            continue;
        }
        tokio::select! {
            () = wait => {}
            () = &mut shutdown => {
                warn!("Interrupted, cancelling job {}", job_id);
                cancelled = true;
                if let Err(e) = jobs::cancel_job(state, &job_id).await {
                    warn!("Cancel failed: {}", e);
                }
            }
        }
    };

    let contacts = if summary.state == JobState::Completed {
        jobs::get_results(state, &job_id).await?
    } else {
        Vec::new()
    };

    match &summary.error {
        Some(error) => warn!("Job {} failed: {}", job_id, error),
        None => info!("Job {} finished with {} contact(s)", job_id, contacts.len()),
    }

    Ok(JobReport {
        job: summary,
        contacts,
    })
}
