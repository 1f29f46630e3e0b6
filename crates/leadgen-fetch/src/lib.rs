//! Polite page fetching for the LeadGen pipeline.
//!
//! Provides per-host rate limiting, a pluggable HTTP transport, and a
//! [`Fetcher`] that classifies failures and retries the retryable ones with
//! exponential backoff.

pub mod error;
pub mod fetcher;
pub mod host;
pub mod rate_limiter;
pub mod retry;
pub mod transport;
pub mod user_agent;

pub use error::{FetchError, FetchErrorKind, Result, TransportError};
pub use fetcher::{FetchedPage, Fetcher, PageFetcher};
pub use host::{host_key, normalize_host};
pub use rate_limiter::HostRateLimiter;
pub use retry::{AttemptOutcome, FetchAttempt, RetryPolicy};
pub use transport::{PageRequest, RawResponse, ReqwestTransport, Transport};
pub use user_agent::UserAgentPool;
