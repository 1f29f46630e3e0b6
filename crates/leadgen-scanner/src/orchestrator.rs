//! Job orchestrator for driving lead-generation jobs.
//!
//! This module provides the `JobOrchestrator`, which accepts submissions,
//! runs each job on a bounded worker pool and folds mined contacts into the
//! job's result set until the target is reached, the search results run
//! out, or the job's failure budget is spent.

use crate::contact::Contact;
use crate::dedup::ContactSet;
use crate::error::{Result, ScanError};
use crate::extractor::ContactExtractor;
use crate::job::{validate_target_count, Job, JobError, JobErrorKind, JobProgress, JobState, JobSummary};
use crate::planner::{Candidate, CandidateParser, SearchPage, SearchPlanner};
use crate::store::{InMemoryJobStore, JobStore};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use leadgen_core::{normalize_term, AppConfig, JobId, Timestamp};
use leadgen_fetch::{FetchError, FetchedPage, Fetcher, HostRateLimiter, PageFetcher};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

/// How a job run ended, before it is written back to the store.
type RunOutcome = std::result::Result<(), JobError>;

/// Orchestrates lead-generation jobs.
///
/// Cheap to clone; clones share the worker pool, store and fetcher.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    /// Application configuration
    config: AppConfig,
    /// Fetcher shared by every job (and therefore one rate limiter)
    fetcher: Arc<dyn PageFetcher>,
    /// Storage for jobs and their results
    store: Arc<dyn JobStore>,
    extractor: ContactExtractor,
    /// Permits for concurrently running jobs
    workers: Semaphore,
    /// Cancellation tokens of jobs that have not finished yet
    active: Mutex<HashMap<JobId, CancellationToken>>,
}

impl JobOrchestrator {
    /// Create an orchestrator from its collaborators.
    #[must_use]
    pub fn new(config: AppConfig, fetcher: Arc<dyn PageFetcher>, store: Arc<dyn JobStore>) -> Self {
        let extractor = ContactExtractor::new(&config.extraction);
        let workers = Semaphore::new(config.jobs.max_concurrent_jobs.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                store,
                extractor,
                workers,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create an orchestrator with the HTTP fetcher and an in-memory store.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let limiter = Arc::new(HostRateLimiter::from_config(&config.rate_limit));
        let fetcher = Fetcher::from_config(&config, limiter)?;
        Ok(Self::new(
            config,
            Arc::new(fetcher),
            Arc::new(InMemoryJobStore::new()),
        ))
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Submit a new job.
    ///
    /// Validates the request, stores the job as `Queued` and returns its ID
    /// immediately; the job runs in the background once a worker is free.
    pub async fn submit(&self, query: &str, location: &str, target_count: u32) -> Result<JobId> {
        self.submit_at(query, location, target_count, Timestamp::now())
            .await
    }

    /// Submit a job with an explicit submission time.
    ///
    /// The job ID is derived from the normalized query, location and
    /// `submitted_at`, so repeating a submission returns the existing ID
    /// without starting a second job.
    pub async fn submit_at(
        &self,
        query: &str,
        location: &str,
        target_count: u32,
        submitted_at: Timestamp,
    ) -> Result<JobId> {
        let query = normalize_term(query);
        let location = normalize_term(location);
        if query.is_empty() {
            return Err(ScanError::Validation("query must not be empty".to_string()));
        }
        if location.is_empty() {
            return Err(ScanError::Validation(
                "location must not be empty".to_string(),
            ));
        }
        validate_target_count(target_count)?;

        let id = JobId::derive(&query, &location, &submitted_at);
        let job = Job::new(id.clone(), query, location, target_count, submitted_at);

        // Register the token before the job becomes visible so a cancel
        // arriving right after submit always finds it.
        let token = CancellationToken::new();
        let mut active = self.inner.active.lock().await;
        if !self.inner.store.insert(job).await? {
            tracing::debug!("Job {} already submitted, returning existing ID", id);
            return Ok(id);
        }
        active.insert(id.clone(), token.clone());
        drop(active);

        tracing::info!(job_id = %id, target_count, "Job submitted");
        tokio::spawn(Arc::clone(&self.inner).run(id.clone(), token));
        Ok(id)
    }

    /// Look up a job by ID.
    pub async fn get_job(&self, id: &JobId) -> Result<Job> {
        self.inner
            .store
            .get(id)
            .await?
            .ok_or_else(|| ScanError::NotFound {
                job_id: id.to_string(),
            })
    }

    /// Summaries of all jobs, oldest first, optionally filtered by state.
    pub async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<JobSummary>> {
        let poll_interval = self.inner.config.jobs.poll_interval_secs;
        Ok(self
            .inner
            .store
            .list(state)
            .await?
            .iter()
            .map(|job| job.summary(poll_interval))
            .collect())
    }

    /// Contacts of a completed job.
    pub async fn results(&self, id: &JobId) -> Result<Vec<Contact>> {
        let job = self.get_job(id).await?;
        match job.state() {
            JobState::Completed => Ok(job.results().to_vec()),
            JobState::Failed => Err(ScanError::JobFailed {
                job_id: id.to_string(),
                error: job
                    .error()
                    .cloned()
                    .unwrap_or_else(|| JobError::new(JobErrorKind::Exhausted, "no error recorded")),
            }),
            state => Err(ScanError::NotReady {
                job_id: id.to_string(),
                state,
            }),
        }
    }

    /// Request cancellation of a queued or running job.
    ///
    /// The job moves to `Failed` with kind `Cancelled` shortly after; poll
    /// it to observe the transition.
    pub async fn cancel(&self, id: &JobId) -> Result<()> {
        // Terminal writes happen under this lock, so the state read below
        // stays current until the token is tripped.
        let active = self.inner.active.lock().await;
        let job = self.get_job(id).await?;
        if job.state().is_terminal() {
            return Err(ScanError::AlreadyFinished {
                job_id: id.to_string(),
                state: job.state(),
            });
        }

        let Some(token) = active.get(id) else {
            return Err(ScanError::Internal(format!(
                "job {id} is {} but has no running worker",
                job.state()
            )));
        };
        token.cancel();
        tracing::info!(job_id = %id, "Cancellation requested");
        Ok(())
    }

    /// Poll a job until it reaches `Completed` or `Failed`.
    pub async fn wait_for(&self, id: &JobId) -> Result<Job> {
        let interval = Duration::from_secs(self.inner.config.jobs.poll_interval_secs.max(1));
        loop {
            let job = self.get_job(id).await?;
            if job.state().is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

impl Inner {
    async fn run(self: Arc<Self>, id: JobId, token: CancellationToken) {
        if let Err(e) = self.execute(&id, &token).await {
            tracing::error!("Job {} aborted: {}", id, e);
            self.active.lock().await.remove(&id);
        }
    }

    /// Write a job's terminal state and retire its cancellation token together.
    async fn settle(&self, job: Job) -> Result<()> {
        let mut active = self.active.lock().await;
        active.remove(job.id());
        self.store.put(job).await
    }

    async fn execute(&self, id: &JobId, token: &CancellationToken) -> Result<()> {
        let permit = tokio::select! {
            biased;
            () = token.cancelled() => None,
            permit = self.workers.acquire() => Some(permit),
        };

        let mut job = self.store.get(id).await?.ok_or_else(|| ScanError::NotFound {
            job_id: id.to_string(),
        })?;

        let Some(permit) = permit else {
            job.fail(JobError::cancelled())?;
            self.settle(job).await?;
            tracing::info!(job_id = %id, "Job cancelled before dispatch");
            return Ok(());
        };
        let _permit = permit.map_err(|_| ScanError::Internal("worker pool closed".to_string()))?;

        job.start()?;
        self.store.put(job.clone()).await?;
        tracing::info!(
            job_id = %id,
            query = job.query(),
            location = job.location(),
            "Job processing"
        );

        let budget = Duration::from_secs(self.config.jobs.job_timeout_secs);
        let mut run = JobRun::new(self, job, token);
        let outcome = match tokio::time::timeout(budget, run.drive()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(JobError::new(
                JobErrorKind::Timeout,
                format!("job exceeded its {}s time budget", budget.as_secs()),
            )),
        };
        run.finish(outcome).await
    }
}

/// Output of one fetch dispatched by a job.
enum TaskOutput {
    Search {
        page: SearchPage,
        result: std::result::Result<FetchedPage, FetchError>,
    },
    Candidate {
        candidate: Candidate,
        result: std::result::Result<FetchedPage, FetchError>,
    },
}

/// State of one job while it runs. Owned by the job's task alone.
struct JobRun<'a> {
    inner: &'a Inner,
    token: &'a CancellationToken,
    job: Job,
    planner: SearchPlanner,
    parser: CandidateParser,
    contacts: ContactSet,
    progress: JobProgress,
    search_host: String,
    queue: VecDeque<Candidate>,
    seen: HashSet<String>,
    source_exhausted: bool,
    consecutive_failures: u32,
    failed_search_pages: u32,
    last_search_error: Option<FetchError>,
}

impl<'a> JobRun<'a> {
    fn new(inner: &'a Inner, job: Job, token: &'a CancellationToken) -> Self {
        let search = &inner.config.search;
        let planner = SearchPlanner::new(search, job.query(), job.location(), job.target_count());
        let search_host = planner.search_host();
        let parser = CandidateParser::new(search, search_host.as_deref());
        let capacity = usize::try_from(job.target_count()).unwrap_or(usize::MAX);

        tracing::debug!(
            job_id = %job.id(),
            min_pages = planner.minimum_pages(),
            max_pages = search.max_pages,
            "Planned search"
        );

        Self {
            inner,
            token,
            job,
            planner,
            parser,
            contacts: ContactSet::with_capacity(capacity),
            progress: JobProgress::default(),
            search_host: search_host.unwrap_or_else(|| "search engine".to_string()),
            queue: VecDeque::new(),
            seen: HashSet::new(),
            source_exhausted: false,
            consecutive_failures: 0,
            failed_search_pages: 0,
            last_search_error: None,
        }
    }

    /// Run until the target is met, the source is exhausted, the failure
    /// threshold is hit or the job is cancelled.
    async fn drive(&mut self) -> RunOutcome {
        let cap = self.inner.config.jobs.per_job_concurrency.max(1);
        let mut in_flight: FuturesUnordered<BoxFuture<'static, TaskOutput>> =
            FuturesUnordered::new();
        let mut searching = false;

        loop {
            if self.contacts.is_full() {
                return Ok(());
            }
            if self.token.is_cancelled() {
                return Err(JobError::cancelled());
            }

            // Keep one search page ahead while the candidate queue runs low
            if !searching && !self.source_exhausted && self.queue.len() < cap {
                if let Some(page) = self.planner.next_page() {
                    in_flight.push(self.fetch_search_page(page));
                    searching = true;
                } else {
                    tracing::debug!(job_id = %self.job.id(), "Search page limit reached");
                    self.source_exhausted = true;
                }
            }

            while in_flight.len() < cap + usize::from(searching) {
                let Some(candidate) = self.queue.pop_front() else {
                    break;
                };
                in_flight.push(self.fetch_candidate(candidate));
            }

            if in_flight.is_empty() {
                return self.exhausted();
            }

            let output = tokio::select! {
                biased;
                () = self.token.cancelled() => return Err(JobError::cancelled()),
                Some(output) = in_flight.next() => output,
            };

            match output {
                TaskOutput::Search { page, result } => {
                    searching = false;
                    self.absorb_search_page(&page, result);
                }
                TaskOutput::Candidate { candidate, result } => {
                    self.absorb_candidate(candidate, result)?;
                }
            }
            self.persist().await;
        }
    }

    fn fetch_search_page(&self, page: SearchPage) -> BoxFuture<'static, TaskOutput> {
        let fetcher = Arc::clone(&self.inner.fetcher);
        async move {
            let result = fetcher.fetch(&page.url).await;
            TaskOutput::Search { page, result }
        }
        .boxed()
    }

    fn fetch_candidate(&self, candidate: Candidate) -> BoxFuture<'static, TaskOutput> {
        let fetcher = Arc::clone(&self.inner.fetcher);
        async move {
            let result = fetcher.fetch(&candidate.url).await;
            TaskOutput::Candidate { candidate, result }
        }
        .boxed()
    }

    fn absorb_search_page(
        &mut self,
        page: &SearchPage,
        result: std::result::Result<FetchedPage, FetchError>,
    ) {
        self.progress.search_pages += 1;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                self.failed_search_pages += 1;
                let limit = self.inner.config.search.max_failed_pages;
                tracing::warn!(
                    job_id = %self.job.id(),
                    page = page.index,
                    failed = self.failed_search_pages,
                    "Search page failed, moving to the next one: {}",
                    e
                );
                if self.failed_search_pages >= limit {
                    tracing::warn!(
                        job_id = %self.job.id(),
                        "{} consecutive search pages failed, abandoning search",
                        limit
                    );
                    self.source_exhausted = true;
                }
                self.last_search_error = Some(e);
                return;
            }
        };
        self.failed_search_pages = 0;
        let candidates = self.parser.parse(&fetched.content, &fetched.final_url);

        let before = self.queue.len();
        for candidate in candidates {
            if self.seen.insert(candidate.url.clone()) {
                self.queue.push_back(candidate);
            }
        }
        let added = self.queue.len() - before;
        self.progress.candidates_found += u32::try_from(added).unwrap_or(u32::MAX);

        if added == 0 {
            tracing::info!(
                job_id = %self.job.id(),
                page = page.index,
                "Search page yielded no new candidates, source exhausted"
            );
            self.source_exhausted = true;
        } else {
            tracing::debug!(job_id = %self.job.id(), page = page.index, added, "Queued candidates");
        }
    }

    fn absorb_candidate(
        &mut self,
        candidate: Candidate,
        result: std::result::Result<FetchedPage, FetchError>,
    ) -> RunOutcome {
        match result {
            Ok(page) => {
                self.progress.pages_fetched += 1;
                self.consecutive_failures = 0;

                let mut contact = self.inner.extractor.extract(&page.content, &page.final_url);
                if contact.business_name.is_none() {
                    contact.business_name = candidate
                        .title
                        .as_deref()
                        .and_then(|title| self.inner.extractor.clean_business_name(title));
                }
                let outcome = self.contacts.insert(contact);
                tracing::debug!(
                    job_id = %self.job.id(),
                    url = %page.final_url,
                    ?outcome,
                    contacts = self.contacts.len(),
                    "Mined page"
                );
                Ok(())
            }
            Err(e) => {
                self.progress.fetch_failures += 1;
                self.consecutive_failures += 1;
                tracing::warn!(
                    job_id = %self.job.id(),
                    consecutive = self.consecutive_failures,
                    "Candidate fetch failed: {}",
                    e
                );

                let threshold = self.inner.config.jobs.consecutive_failure_threshold;
                if self.consecutive_failures >= threshold {
                    return Err(JobError::new(
                        e.kind.into(),
                        format!("{threshold} consecutive page fetches failed; last: {e}"),
                    ));
                }
                Ok(())
            }
        }
    }

    fn exhausted(&self) -> RunOutcome {
        if !self.contacts.is_empty() {
            return Ok(());
        }
        // No candidate was ever queued, so the search engine is the cause
        if let (0, Some(e)) = (self.progress.candidates_found, &self.last_search_error) {
            return Err(JobError::new(
                e.kind.into(),
                format!(
                    "{} returned no usable result pages; last failure: {e}",
                    self.search_host
                ),
            ));
        }
        Err(JobError::new(
            JobErrorKind::Exhausted,
            format!(
                "search results ran out after {} page(s) and {} candidate(s) without yielding a contact",
                self.progress.search_pages, self.progress.candidates_found
            ),
        ))
    }

    /// Write the running result set back to the store.
    async fn persist(&mut self) {
        if let Err(e) = self.job.record(self.contacts.contacts(), self.progress) {
            tracing::error!("Job {} rejected progress update: {}", self.job.id(), e);
            return;
        }
        if let Err(e) = self.inner.store.put(self.job.clone()).await {
            tracing::warn!("Failed to persist progress for job {}: {}", self.job.id(), e);
        }
    }

    async fn finish(mut self, outcome: RunOutcome) -> Result<()> {
        self.job.record(self.contacts.contacts(), self.progress)?;
        match outcome {
            Ok(()) => {
                self.job.complete()?;
                tracing::info!(
                    job_id = %self.job.id(),
                    contacts = self.contacts.len(),
                    target = self.job.target_count(),
                    "Job completed"
                );
            }
            Err(error) => {
                tracing::warn!(
                    job_id = %self.job.id(),
                    kind = %error.kind,
                    contacts = self.contacts.len(),
                    "Job failed: {}",
                    error.message
                );
                self.job.fail(error)?;
            }
        }
        self.inner.settle(self.job).await
    }
}
