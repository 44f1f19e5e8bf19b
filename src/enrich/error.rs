//! Failure taxonomy for page fetching and text extraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why an enrichment attempt sequence did not produce usable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    ConnectionError,
    HttpError,
    Blocked,
    ExtractEmpty,
    ExtractLowQuality,
    SkippedPolicy,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Timeout,
        ErrorKind::ConnectionError,
        ErrorKind::HttpError,
        ErrorKind::Blocked,
        ErrorKind::ExtractEmpty,
        ErrorKind::ExtractLowQuality,
        ErrorKind::SkippedPolicy,
    ];

    /// Only transient network failures are worth another network call; every
    /// other kind would deterministically reproduce the same result.
    pub fn retryable(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::ConnectionError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::HttpError => "http_error",
            ErrorKind::Blocked => "blocked",
            ErrorKind::ExtractEmpty => "extract_empty",
            ErrorKind::ExtractLowQuality => "extract_low_quality",
            ErrorKind::SkippedPolicy => "skipped_policy",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced by a `PageFetcher` for a single network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("blocked by remote ({0})")]
    Blocked(String),
}

impl FetchFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchFailure::Timeout(_) => ErrorKind::Timeout,
            FetchFailure::Connection(_) => ErrorKind::ConnectionError,
            FetchFailure::Status(_) => ErrorKind::HttpError,
            FetchFailure::Blocked(_) => ErrorKind::Blocked,
        }
    }
}
