//! Application state management.

use leadgen_core::AppConfig;
use leadgen_scanner::JobOrchestrator;

/// State shared by all commands.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: JobOrchestrator,
}

impl AppState {
    /// Build state with the HTTP fetcher and in-memory job store.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        tracing::info!(
            max_concurrent_jobs = config.jobs.max_concurrent_jobs,
            per_job_concurrency = config.jobs.per_job_concurrency,
            min_interval_ms = config.rate_limit.min_interval_ms,
            "Initializing job orchestrator"
        );
        Ok(Self {
            orchestrator: JobOrchestrator::from_config(config)?,
        })
    }

    pub fn with_orchestrator(orchestrator: JobOrchestrator) -> Self {
        Self { orchestrator }
    }
}
