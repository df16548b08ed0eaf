//! Shared types for the WEBTRACK tracker.
//!
//! These types form the data model used across all modules: the query
//! definition each worker runs, the records it writes, the version
//! ledger entries, and the error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Query definition
// ---------------------------------------------------------------------------

/// How the extracted fragment is interpreted before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    String,
    Number,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultType::String => write!(f, "string"),
            ResultType::Number => write!(f, "number"),
        }
    }
}

impl std::str::FromStr for ResultType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" | "text" => Ok(ResultType::String),
            "number" | "numeric" => Ok(ResultType::Number),
            other => Err(TrackerError::Config(format!(
                "invalid result type {other:?}: only \"string\" and \"number\" are supported"
            ))),
        }
    }
}

/// Which transport retrieves the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchBackend {
    /// Direct HTTP GET of the document.
    Plain,
    /// Full-page render in a headless browser, then DOM dump.
    Rendered,
}

impl fmt::Display for FetchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchBackend::Plain => write!(f, "plain"),
            FetchBackend::Rendered => write!(f, "rendered"),
        }
    }
}

impl std::str::FromStr for FetchBackend {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "http" => Ok(FetchBackend::Plain),
            "rendered" | "chrome" => Ok(FetchBackend::Rendered),
            other => Err(TrackerError::Config(format!(
                "invalid request backend {other:?}: only \"plain\" and \"rendered\" are supported"
            ))),
        }
    }
}

/// Configuration for one tracked resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Derived from the source identifier (file stem); unique per process.
    pub name: String,
    pub url: String,
    pub before: String,
    pub after: String,
    /// Splits `before`/`after` into ordered literal parts.
    pub any_tag: String,
    pub result_type: ResultType,
    pub fetch_backend: FetchBackend,
    pub interval_seconds: u64,
    pub only_if_different: bool,
    pub only_if_unique: bool,
    /// Assigned once at startup by the version resolver.
    pub version: i64,
}

impl fmt::Display for QueryDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} v{}] {} ({}, {}, every {}s)",
            self.name,
            self.version,
            self.url,
            self.result_type,
            self.fetch_backend,
            self.interval_seconds,
        )
    }
}

impl QueryDefinition {
    /// Helper to build a test definition with sensible defaults.
    #[cfg(test)]
    pub fn sample(name: &str) -> Self {
        QueryDefinition {
            name: name.to_string(),
            url: "https://example.com/price".to_string(),
            before: "pricetag: ".to_string(),
            after: " USD".to_string(),
            any_tag: "<any>".to_string(),
            result_type: ResultType::String,
            fetch_backend: FetchBackend::Plain,
            interval_seconds: 0,
            only_if_different: false,
            only_if_unique: false,
            version: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// One observation appended to a query's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRecord {
    /// Unix seconds.
    pub timestamp: i64,
    /// Canonical form for both text and numeric results.
    pub value: String,
    pub version: i64,
}

/// One entry of the shared version ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    pub version: i64,
    pub hash: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures of the pure extraction and number-normalization steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("beginning not found")]
    BeginningNotFound,

    #[error("ending not found")]
    EndingNotFound,

    #[error("no digits in the input string: {0:?}")]
    NoDigits(String),

    #[error("invalid number in the input string: {0:?}")]
    InvalidNumber(String),
}

/// Domain-specific error taxonomy for WEBTRACK.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Extraction error: {0}")]
    Extraction(ParseError),

    #[error("Number format error: {0}")]
    NumberFormat(ParseError),

    #[error("Fetch error ({url}): {message}")]
    Fetch { url: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
