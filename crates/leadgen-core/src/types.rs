//! Shared types used across the LeadGen workspace.
//!
//! This module defines common newtypes and the normalization helpers that
//! give job identifiers and search terms a single canonical form.

use crate::error::LeadgenError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Normalize a caller-supplied search term.
///
/// Trims, lowercases and collapses inner whitespace runs to a single space.
#[must_use]
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a term to `[a-z0-9_]`, replacing each run of other characters with `_`.
///
/// Returns `"x"` when nothing alphanumeric survives so identifiers never
/// contain empty segments.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push('x');
    }
    slug
}

/// Newtype for job identifiers.
///
/// Job IDs are derived from the normalized query, location and submission
/// time, so resubmitting the same triple always produces the same ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Parse a `JobId` received from a caller.
    ///
    /// # Errors
    /// Returns error if the ID does not have the `{query}_{location}_{millis}` shape.
    pub fn new(id: impl Into<String>) -> Result<Self, LeadgenError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Derive the ID for a submission.
    #[must_use]
    pub fn derive(query: &str, location: &str, submitted_at: &Timestamp) -> Self {
        Self(format!(
            "{}_{}_{}",
            slugify(query),
            slugify(location),
            submitted_at.timestamp_millis()
        ))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), LeadgenError> {
        static JOB_ID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = JOB_ID_REGEX
            .get_or_init(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*_[0-9]+$").expect("valid regex"));

        if id.len() > 256 {
            return Err(LeadgenError::InvalidJobId {
                id: id.to_string(),
                reason: format!("must be at most 256 characters, got {}", id.len()),
            });
        }

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(LeadgenError::InvalidJobId {
                id: id.to_string(),
                reason: "expected '<query>_<location>_<millis>'".to_string(),
            })
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, LeadgenError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| LeadgenError::InvalidTimestamp {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get seconds since Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// Get milliseconds since Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
