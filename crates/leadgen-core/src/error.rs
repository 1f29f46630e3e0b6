//! Core error types for the LeadGen pipeline.
//!
//! `LeadgenError` covers values parsed from callers (job IDs, timestamps);
//! `ConfigError` covers loading and validating `config.toml`. Subsystem
//! crates keep their own enums.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing caller-supplied identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeadgenError {
    /// A job ID that does not have the derived `{query}_{location}_{millis}` shape
    #[error("invalid job ID '{id}': {reason}")]
    InvalidJobId {
        /// The rejected ID
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// A timestamp that is not valid RFC 3339
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// The rejected input
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No home/config directory could be resolved for this user
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// An explicitly requested config file does not exist
    #[error("config file not found at {}", path.display())]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// The file exists but could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The file is not valid TOML for `AppConfig`
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// TOML decoder message
        source: toml::de::Error,
    },

    /// A setting that would stall or disable the pipeline
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Dotted setting name, e.g. `jobs.job_timeout_secs`
        field: &'static str,
        /// Why the value was rejected
        reason: &'static str,
    },
}

/// Result type alias using `LeadgenError`.
pub type Result<T> = std::result::Result<T, LeadgenError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LeadgenError::InvalidJobId {
            id: "Bad ID".to_string(),
            reason: "expected '<query>_<location>_<millis>'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid job ID 'Bad ID': expected '<query>_<location>_<millis>'"
        );

        let err = ConfigError::InvalidValue {
            field: "jobs.per_job_concurrency",
            reason: "must be at least 1",
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for jobs.per_job_concurrency: must be at least 1"
        );
    }

    #[test]
    fn test_config_error_names_the_file() {
        let err = ConfigError::NotFound {
            path: PathBuf::from("/etc/leadgen/config.toml"),
        };
        assert_eq!(
            err.to_string(),
            "config file not found at /etc/leadgen/config.toml"
        );
    }
}
