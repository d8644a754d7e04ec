//! Options, results and errors of a replay run.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// HEAD the endpoint before replaying
    pub check_up: bool,
    /// Ask for gzip responses and decompress them before comparing
    pub gzip: bool,
    /// Maximum requests in flight
    pub concurrency: usize,
    /// Per-request timeout enforced by the HTTP client
    pub timeout: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            check_up: true,
            gzip: true,
            concurrency: 64,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Fatal replay errors. Per-entry problems are counted, not raised.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Liveness check of {url} failed: {reason}")]
    LivenessCheck { url: String, reason: String },
    #[error("Unable to process fixture document: {0}")]
    MalformedFixtureDocument(#[source] serde_json::Error),
}

/// One fixture whose replay did not produce the expected response.
#[derive(Debug, Clone)]
pub struct ReplayFailure {
    pub index: usize,
    pub url: String,
    pub request: String,
    pub reason: String,
}

impl fmt::Display for ReplayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}: {}", self.url, self.request, self.reason)
    }
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub success: u64,
    pub failure: u64,
    pub skipped: u64,
    /// Details for each failed fixture, in document order
    pub failures: Vec<ReplayFailure>,
}

impl ReplaySummary {
    /// Requests that were attempted (skipped entries excluded)
    pub fn total(&self) -> u64 {
        self.success + self.failure
    }

    pub fn is_success(&self) -> bool {
        self.failure == 0
    }
}
