use crate::error::FetchErrorKind;
use leadgen_core::RetryConfig;
use std::time::Duration;

/// Result of one transport attempt, as judged by the [`RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure(FetchErrorKind),
    TerminalFailure(FetchErrorKind),
}

/// One attempt at fetching a URL. Never stored on the job.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub url: String,
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// Backoff and attempt budget per failure kind.
///
/// Timeouts, rate limits and server errors share one exponential schedule
/// (`base * 2^(n-1)`, capped). Network errors get a smaller attempt budget.
/// `NotFound` and other client errors are never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub network_max_attempts: u32,
}

impl RetryPolicy {
    /// Total attempts allowed for a failure kind.
    #[must_use]
    pub fn attempts_for(&self, kind: FetchErrorKind) -> u32 {
        match kind {
            FetchErrorKind::Timeout
            | FetchErrorKind::RateLimited
            | FetchErrorKind::ServerError => self.max_attempts,
            FetchErrorKind::NetworkError => self.network_max_attempts,
            FetchErrorKind::NotFound | FetchErrorKind::ClientError => 1,
        }
    }

    /// Classify a failed attempt given how many attempts have been made.
    #[must_use]
    pub fn classify(&self, kind: FetchErrorKind, attempt_number: u32) -> AttemptOutcome {
        if kind.is_retryable() && attempt_number < self.attempts_for(kind) {
            AttemptOutcome::RetryableFailure(kind)
        } else {
            AttemptOutcome::TerminalFailure(kind)
        }
    }

    /// Delay before the attempt following `attempt_number`.
    ///
    /// A server-provided `Retry-After` can lengthen the delay but never past `max_delay`.
    #[must_use]
    pub fn backoff(&self, attempt_number: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt_number.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        match retry_after {
            Some(hint) => delay.max(hint).min(self.max_delay),
            None => delay,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
            network_max_attempts: config.network_max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1, None), Duration::from_secs(2));
        assert_eq!(policy.backoff(2, None), Duration::from_secs(4));
        assert_eq!(policy.backoff(3, None), Duration::from_secs(8));
        assert_eq!(policy.backoff(10, None), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_after_extends_but_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.backoff(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            policy.backoff(1, Some(Duration::from_secs(1))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.backoff(1, Some(Duration::from_secs(3600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_rate_limited_gets_three_attempts() {
        let policy = RetryPolicy::default();
        let kind = FetchErrorKind::RateLimited;
        assert_eq!(
            policy.classify(kind, 1),
            AttemptOutcome::RetryableFailure(kind)
        );
        assert_eq!(
            policy.classify(kind, 2),
            AttemptOutcome::RetryableFailure(kind)
        );
        assert_eq!(
            policy.classify(kind, 3),
            AttemptOutcome::TerminalFailure(kind)
        );
    }

    #[test]
    fn test_network_error_retried_once() {
        let policy = RetryPolicy::default();
        let kind = FetchErrorKind::NetworkError;
        assert_eq!(
            policy.classify(kind, 1),
            AttemptOutcome::RetryableFailure(kind)
        );
        assert_eq!(
            policy.classify(kind, 2),
            AttemptOutcome::TerminalFailure(kind)
        );
    }

    #[test]
    fn test_client_errors_are_terminal() {
        let policy = RetryPolicy::default();
        for kind in [FetchErrorKind::NotFound, FetchErrorKind::ClientError] {
            assert_eq!(
                policy.classify(kind, 1),
                AttemptOutcome::TerminalFailure(kind)
            );
        }
    }
}
