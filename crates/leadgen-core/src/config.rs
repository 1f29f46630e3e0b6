//! Configuration management for LeadGen.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every policy constant of the pipeline
//! (rate-limit interval, retry budget, page bound, failure threshold, job
//! timeout) lives here with its default.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/leadgen/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP fetch settings
    pub fetch: FetchConfig,
    /// Per-host politeness settings
    pub rate_limit: RateLimitConfig,
    /// Retry and backoff settings
    pub retry: RetryConfig,
    /// Search engine settings
    pub search: SearchConfig,
    /// Contact extraction settings
    pub extraction: ExtractionConfig,
    /// Job scheduling settings
    pub jobs: JobsConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML or fail validation
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `LEADGEN_MIN_INTERVAL_MS`: Override per-host minimum request interval
    /// - `LEADGEN_FETCH_TIMEOUT_SECS`: Override per-attempt fetch timeout
    /// - `LEADGEN_MAX_CONCURRENT_JOBS`: Override worker pool size
    /// - `LEADGEN_PER_JOB_CONCURRENCY`: Override concurrent fetches per job
    /// - `LEADGEN_JOB_TIMEOUT_SECS`: Override overall job budget
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `LEADGEN_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Some(ms) = env_parse::<u64>("LEADGEN_MIN_INTERVAL_MS") {
            self.rate_limit.min_interval_ms = ms;
            tracing::debug!("Override rate_limit.min_interval_ms from env: {}", ms);
        }

        if let Some(secs) = env_parse::<u64>("LEADGEN_FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = secs;
            tracing::debug!("Override fetch.timeout_secs from env: {}", secs);
        }

        if let Some(n) = env_parse::<usize>("LEADGEN_MAX_CONCURRENT_JOBS") {
            self.jobs.max_concurrent_jobs = n;
            tracing::debug!("Override jobs.max_concurrent_jobs from env: {}", n);
        }

        if let Some(n) = env_parse::<usize>("LEADGEN_PER_JOB_CONCURRENCY") {
            self.jobs.per_job_concurrency = n;
            tracing::debug!("Override jobs.per_job_concurrency from env: {}", n);
        }

        if let Some(secs) = env_parse::<u64>("LEADGEN_JOB_TIMEOUT_SECS") {
            self.jobs.job_timeout_secs = secs;
            tracing::debug!("Override jobs.job_timeout_secs from env: {}", secs);
        }
    }

    /// Reject values that would stall or disable the pipeline.
    pub fn validate(&self) -> ConfigResult<()> {
        let checks: [(&'static str, bool, &'static str); 10] = [
            (
                "fetch.timeout_secs",
                self.fetch.timeout_secs > 0,
                "must be at least 1",
            ),
            (
                "retry.max_attempts",
                self.retry.max_attempts > 0,
                "must be at least 1",
            ),
            (
                "retry.max_delay_ms",
                self.retry.max_delay_ms >= self.retry.base_delay_ms,
                "must not be lower than retry.base_delay_ms",
            ),
            (
                "search.max_pages",
                self.search.max_pages > 0,
                "must be at least 1",
            ),
            (
                "search.max_failed_pages",
                self.search.max_failed_pages > 0,
                "must be at least 1",
            ),
            (
                "search.url_template",
                self.search.url_template.contains("{query}"),
                "must contain a {query} placeholder",
            ),
            (
                "jobs.max_concurrent_jobs",
                self.jobs.max_concurrent_jobs > 0,
                "must be at least 1",
            ),
            (
                "jobs.per_job_concurrency",
                self.jobs.per_job_concurrency > 0,
                "must be at least 1",
            ),
            (
                "jobs.consecutive_failure_threshold",
                self.jobs.consecutive_failure_threshold > 0,
                "must be at least 1",
            ),
            (
                "jobs.job_timeout_secs",
                self.jobs.job_timeout_secs > 0,
                "must be at least 1",
            ),
        ];

        for (field, ok, reason) in checks {
            if !ok {
                return Err(ConfigError::InvalidValue { field, reason });
            }
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/leadgen/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "leadgen", "leadgen").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|val| val.parse().ok())
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Maximum redirects followed per request
    pub max_redirects: usize,
    /// User agents rotated across requests
    pub user_agents: Vec<String>,
    /// `Accept-Language` header value
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 10,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
            ],
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// Per-host politeness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum delay between two requests to the same host, in milliseconds
    pub min_interval_ms: u64,
    /// Hosts unseen for this long are dropped from the limiter table
    pub idle_eviction_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            idle_eviction_secs: 600,
        }
    }
}

/// Retry and backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// First backoff delay in milliseconds; doubled on each retry
    pub base_delay_ms: u64,
    /// Upper bound for any single backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Total attempts for timeouts, rate limits and server errors
    pub max_attempts: u32,
    /// Total attempts for connection/DNS failures
    pub network_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            max_attempts: 3,
            network_max_attempts: 2,
        }
    }
}

/// Search engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result page URL with `{query}`, `{location}`, `{start}` and `{num}` placeholders
    pub url_template: String,
    /// Results requested per page (`{num}`), also the `{start}` step
    pub results_per_page: u32,
    /// Hard bound on result pages requested per job
    pub max_pages: u32,
    /// Consecutive result pages that may fail to fetch before the search is abandoned
    pub max_failed_pages: u32,
    /// CSS selector for one organic result block
    pub result_selector: String,
    /// CSS selector for the result heading inside a block
    pub title_selector: String,
    /// CSS selector for the result snippet inside a block
    pub snippet_selector: String,
    /// Domains never treated as business pages (subdomains included)
    pub denylist: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url_template:
                "https://www.google.com/search?q={query}+{location}&start={start}&num={num}"
                    .to_string(),
            results_per_page: 10,
            max_pages: 10,
            max_failed_pages: 3,
            result_selector: "div.g".to_string(),
            title_selector: "h3".to_string(),
            snippet_selector: "div.VwiC3b, span.st".to_string(),
            denylist: [
                "google.com",
                "gstatic.com",
                "googleusercontent.com",
                "googleadservices.com",
                "doubleclick.net",
                "youtube.com",
                "facebook.com",
                "instagram.com",
                "twitter.com",
                "x.com",
                "linkedin.com",
                "pinterest.com",
                "yelp.com",
                "yellowpages.com",
                "bbb.org",
                "angi.com",
                "thumbtack.com",
                "tripadvisor.com",
                "wikipedia.org",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Contact extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Business names taken from page titles are truncated to this many characters
    pub max_business_name_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_business_name_len: 120,
        }
    }
}

/// Job scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Jobs processed at the same time; further jobs wait in `Queued`
    pub max_concurrent_jobs: usize,
    /// Candidate pages fetched concurrently within one job
    pub per_job_concurrency: usize,
    /// Consecutive terminal fetch failures that fail the job
    pub consecutive_failure_threshold: u32,
    /// Wall-clock budget for one job in seconds
    pub job_timeout_secs: u64,
    /// Suggested polling interval for callers while a job is active
    pub poll_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            per_job_concurrency: 5,
            consecutive_failure_threshold: 5,
            job_timeout_secs: 900,
            poll_interval_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.rate_limit.min_interval_ms, 1000);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.search.max_pages, 10);
        assert_eq!(config.jobs.per_job_concurrency, 5);
        assert_eq!(config.jobs.consecutive_failure_threshold, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[fetch]"));
        assert!(toml_str.contains("[rate_limit]"));
        assert!(toml_str.contains("[jobs]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.search.url_template, config.search.url_template);
        assert_eq!(parsed.search.denylist, config.search.denylist);
    }

    #[test]
    fn test_config_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.jobs.max_concurrent_jobs = 8;
        config.rate_limit.min_interval_ms = 2500;

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.jobs.max_concurrent_jobs, 8);
        assert_eq!(loaded.rate_limit.min_interval_ms, 2500);
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let result = AppConfig::load_from(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.jobs.per_job_concurrency = 0;
        let err = config.validate().expect_err("zero concurrency must be rejected");
        assert!(err.to_string().contains("jobs.per_job_concurrency"));
    }

    #[test]
    fn test_validate_rejects_zero_job_budgets() {
        let mut config = AppConfig::default();
        config.jobs.job_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "jobs.job_timeout_secs",
                ..
            })
        ));

        let mut config = AppConfig::default();
        config.jobs.consecutive_failure_threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "jobs.consecutive_failure_threshold",
                ..
            })
        ));

        let mut config = AppConfig::default();
        config.search.max_failed_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_reports_bad_toml() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "[jobs]\nmax_concurrent_jobs = \"many\"\n").expect("write config file");

        match AppConfig::load_from(&config_path) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, config_path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_rejects_zero_timeout() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");
        fs::write(&config_path, "[jobs]\njob_timeout_secs = 0\n").expect("write config file");

        let err = AppConfig::load_from(&config_path).expect_err("zero budget must be rejected");
        assert!(err.to_string().contains("jobs.job_timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = AppConfig::default();
        config.retry.max_delay_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("LEADGEN_MIN_INTERVAL_MS", "250");
        std::env::set_var("LEADGEN_PER_JOB_CONCURRENCY", "2");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.rate_limit.min_interval_ms, 250);
        assert_eq!(config.jobs.per_job_concurrency, 2);

        std::env::remove_var("LEADGEN_MIN_INTERVAL_MS");
        std::env::remove_var("LEADGEN_PER_JOB_CONCURRENCY");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[jobs]
max_concurrent_jobs = 2

[search]
max_pages = 3
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.jobs.max_concurrent_jobs, 2);
        assert_eq!(config.search.max_pages, 3);
        // These should be defaults
        assert_eq!(config.jobs.per_job_concurrency, 5);
        assert_eq!(config.search.results_per_page, 10);
        assert!(!config.search.denylist.is_empty());
    }
}
