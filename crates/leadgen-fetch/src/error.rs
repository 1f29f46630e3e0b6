use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// No response within the per-attempt timeout
    Timeout,
    /// HTTP 429
    RateLimited,
    /// HTTP 404 or 410
    NotFound,
    /// Any other 4xx, or a URL that cannot be requested at all
    ClientError,
    /// HTTP 5xx
    ServerError,
    /// DNS or connection failure
    NetworkError,
}

impl FetchErrorKind {
    /// Map a non-success HTTP status to its failure kind.
    ///
    /// Returns `None` for 2xx statuses.
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 | 410 => Some(Self::NotFound),
            429 => Some(Self::RateLimited),
            500..=599 => Some(Self::ServerError),
            _ => Some(Self::ClientError),
        }
    }

    /// Whether this kind may ever be retried.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::NotFound | Self::ClientError)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "Timeout",
            Self::RateLimited => "RateLimited",
            Self::NotFound => "NotFound",
            Self::ClientError => "ClientError",
            Self::ServerError => "ServerError",
            Self::NetworkError => "NetworkError",
        };
        f.write_str(name)
    }
}

/// A fetch that failed after exhausting its retry budget, or failed terminally.
#[derive(Debug, Clone, Error)]
#[error("{kind} fetching {url} after {attempts} attempt(s): {message}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    pub message: String,
    pub attempts: u32,
}

impl FetchError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            kind: FetchErrorKind::ClientError,
            message: reason.into(),
            attempts: 0,
        }
    }
}

/// Failure of a single transport round trip, before HTTP status classification.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
