//! Rate-limited, retrying page fetcher.

use crate::error::{FetchError, FetchErrorKind, Result, TransportError};
use crate::host::host_key;
use crate::rate_limiter::HostRateLimiter;
use crate::retry::{AttemptOutcome, FetchAttempt, RetryPolicy};
use crate::transport::{PageRequest, RawResponse, ReqwestTransport, Transport};
use crate::user_agent::UserAgentPool;
use leadgen_core::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Content of a successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub requested_url: String,
    pub final_url: String,
    pub content: String,
    pub attempts: u32,
}

/// Anything that can turn a URL into page content.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Fetcher that throttles per host and retries retryable failures.
pub struct Fetcher<T = ReqwestTransport> {
    transport: T,
    limiter: Arc<HostRateLimiter>,
    retry: RetryPolicy,
    timeout: Duration,
    max_redirects: usize,
    user_agents: UserAgentPool,
    accept_language: String,
}

impl Fetcher<ReqwestTransport> {
    /// Build a fetcher on top of `reqwest` using the application config.
    pub fn from_config(
        config: &AppConfig,
        limiter: Arc<HostRateLimiter>,
    ) -> std::result::Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.fetch)?;
        Ok(Self::new(transport, limiter, config))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, limiter: Arc<HostRateLimiter>, config: &AppConfig) -> Self {
        Self {
            transport,
            limiter,
            retry: RetryPolicy::from(&config.retry),
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_redirects: config.fetch.max_redirects,
            user_agents: UserAgentPool::new(config.fetch.user_agents.clone()),
            accept_language: config.fetch.accept_language.clone(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn limiter(&self) -> &Arc<HostRateLimiter> {
        &self.limiter
    }

    /// Run one attempt, redirects included, and map it to either a response
    /// or a failure kind.
    async fn attempt(
        &self,
        url: &Url,
        host: &str,
    ) -> std::result::Result<RawResponse, AttemptFailure> {
        let response = self.follow(url, host).await?;
        match FetchErrorKind::from_status(response.status) {
            None => Ok(response),
            Some(kind) => Err((
                kind,
                format!("HTTP {}", response.status),
                response.retry_after,
            )),
        }
    }

    /// Request `url`, following redirects hop by hop. Every hop waits for
    /// its own host's slot and gets the full per-request timeout.
    async fn follow(
        &self,
        url: &Url,
        host: &str,
    ) -> std::result::Result<RawResponse, AttemptFailure> {
        let mut current = url.clone();
        let mut current_host = host.to_string();
        let mut hops = 0;

        loop {
            self.limiter.acquire(&current_host).await;

            let request = PageRequest {
                url: current.clone(),
                user_agent: self.user_agents.pick().to_string(),
                accept_language: self.accept_language.clone(),
            };
            let response = match tokio::time::timeout(self.timeout, self.transport.get(&request)).await
            {
                Ok(Ok(response)) => response,
                Err(_) => {
                    return Err((
                        FetchErrorKind::Timeout,
                        format!("no response within {:?}", self.timeout),
                        None,
                    ))
                }
                Ok(Err(TransportError::Timeout)) => {
                    return Err((
                        FetchErrorKind::Timeout,
                        "request timed out".to_string(),
                        None,
                    ))
                }
                Ok(Err(TransportError::Network(msg))) => {
                    return Err((FetchErrorKind::NetworkError, msg, None))
                }
                Ok(Err(TransportError::InvalidRequest(msg))) => {
                    return Err((FetchErrorKind::ClientError, msg, None))
                }
            };

            let Some(target) = response.redirect_target() else {
                return Ok(response);
            };
            let next = target.map_err(|e| -> AttemptFailure {
                (FetchErrorKind::ClientError, format!("bad redirect location: {e}"), None)
            })?;
            let next_host = match (next.scheme(), host_key(&next)) {
                ("http" | "https", Some(next_host)) => next_host,
                _ => {
                    return Err((
                        FetchErrorKind::ClientError,
                        format!("redirect to unsupported URL '{next}'"),
                        None,
                    ))
                }
            };

            hops += 1;
            if hops > self.max_redirects {
                return Err((
                    FetchErrorKind::ClientError,
                    format!("more than {} redirects", self.max_redirects),
                    None,
                ));
            }
            tracing::debug!(from = %current, to = %next, hop = hops, "Following redirect");
            current = next;
            current_host = next_host;
        }
    }
}

/// Kind, message and server-requested delay of a failed attempt.
type AttemptFailure = (FetchErrorKind, String, Option<Duration>);

#[async_trait::async_trait]
impl<T: Transport> PageFetcher for Fetcher<T> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(
                url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        let host = host_key(&parsed).ok_or_else(|| FetchError::invalid_url(url, "no host in URL"))?;

        let mut attempt_number = 0;
        loop {
            attempt_number += 1;
            let started = Instant::now();
            let result = self.attempt(&parsed, &host).await;
            let elapsed = started.elapsed();

            let (kind, message, retry_after) = match result {
                Ok(response) => {
                    let attempt = FetchAttempt {
                        url: url.to_string(),
                        attempt_number,
                        outcome: AttemptOutcome::Success,
                        elapsed,
                    };
                    tracing::debug!(
                        url = %attempt.url,
                        attempt = attempt.attempt_number,
                        elapsed_ms = u64::try_from(attempt.elapsed.as_millis()).unwrap_or(u64::MAX),
                        bytes = response.body.len(),
                        "fetched page"
                    );
                    return Ok(FetchedPage {
                        requested_url: url.to_string(),
                        final_url: response.final_url,
                        content: response.body,
                        attempts: attempt_number,
                    });
                }
                Err(failure) => failure,
            };

            let attempt = FetchAttempt {
                url: url.to_string(),
                attempt_number,
                outcome: self.retry.classify(kind, attempt_number),
                elapsed,
            };

            if let AttemptOutcome::RetryableFailure(kind) = attempt.outcome {
                let delay = self.retry.backoff(attempt_number, retry_after);
                tracing::warn!(
                    url = %attempt.url,
                    %kind,
                    attempt = attempt.attempt_number,
                    max_attempts = self.retry.attempts_for(kind),
                    "Fetch failed ({}), retrying in {:?}...",
                    message,
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            tracing::warn!(
                url = %attempt.url,
                %kind,
                attempt = attempt.attempt_number,
                elapsed_ms = u64::try_from(attempt.elapsed.as_millis()).unwrap_or(u64::MAX),
                "Fetch failed permanently: {}",
                message
            );
            return Err(FetchError {
                url: url.to_string(),
                kind,
                message,
                attempts: attempt_number,
            });
        }
    }
}
