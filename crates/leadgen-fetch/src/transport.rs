use crate::error::TransportError;
use leadgen_core::FetchConfig;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, LOCATION, RETRY_AFTER, USER_AGENT};
use reqwest::{redirect, Client};
use std::time::Duration;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// One outgoing page request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: Url,
    pub user_agent: String,
    pub accept_language: String,
}

/// Status, final URL and body of a completed round trip.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
    pub retry_after: Option<Duration>,
    /// `Location` header of a redirect, unresolved
    pub location: Option<String>,
}

impl RawResponse {
    /// Absolute target of a 3xx response, if it names one.
    pub fn redirect_target(&self) -> Option<Result<Url, url::ParseError>> {
        if !matches!(self.status, 301 | 302 | 303 | 307 | 308) {
            return None;
        }
        let location = self.location.as_deref()?;
        Some(Url::parse(&self.final_url).and_then(|base| base.join(location)))
    }
}

/// A single HTTP GET, without retries, throttling or redirect following.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &PageRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Redirects are returned to the caller so each hop can be throttled.
    pub fn new(config: &FetchConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn classify(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &PageRequest) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(request.url.clone())
            .header(USER_AGENT, &request.user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, &request.accept_language)
            .send()
            .await
            .map_err(|e| Self::classify(&e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Error bodies are never mined, so skip downloading them.
        let body = if status.is_success() {
            response.text().await.map_err(|e| Self::classify(&e))?
        } else {
            String::new()
        };

        Ok(RawResponse {
            status: status.as_u16(),
            final_url,
            body,
            retry_after,
            location,
        })
    }
}
