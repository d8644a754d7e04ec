//! Replay harness: re-issues every fixture request against a running stub
//! and checks the answer, counting successes and failures.
//!
//! Requests run concurrently (bounded by `ReplayOptions::concurrency`);
//! outcome counters are atomics shared by the tasks. No cancellation beyond
//! the HTTP client's own timeout.

mod harness;
mod types;

pub use harness::{responses_match, target_url, ReplayHarness};
pub use types::{ReplayError, ReplayFailure, ReplayOptions, ReplaySummary};
