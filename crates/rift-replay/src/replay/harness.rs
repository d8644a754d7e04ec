//! Concurrent replay of a fixture document against a live stub.

use super::types::{ReplayError, ReplayFailure, ReplayOptions, ReplaySummary};
use crate::fixture::{canonicalize, FixtureCompiler, FixtureEntry, SchemaSet};
use reqwest::{Client, StatusCode};
use serde_json::value::RawValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Shared outcome counters. The only state written by concurrent tasks.
#[derive(Debug, Default)]
struct ReplayCounters {
    success: AtomicU64,
    failure: AtomicU64,
    skipped: AtomicU64,
}

/// A fixture ready to be sent.
#[derive(Debug, Clone)]
struct ReplayCase {
    index: usize,
    url: String,
    body: String,
    expected: String,
}

/// Re-issues fixture requests and compares the answers.
#[derive(Debug)]
pub struct ReplayHarness {
    client: Client,
    endpoint: String,
    options: ReplayOptions,
    schemas: Option<Arc<SchemaSet>>,
}

impl ReplayHarness {
    pub fn new(endpoint: impl Into<String>, options: ReplayOptions) -> Result<Self, ReplayError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .gzip(options.gzip)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            options,
            schemas: None,
        })
    }

    /// Only replay entries these schemas accept; the rest count as skipped.
    pub fn with_schemas(mut self, schemas: SchemaSet) -> Self {
        self.schemas = Some(Arc::new(schemas));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HEAD the endpoint; anything but a success status aborts the run.
    pub async fn check_up(&self) -> Result<(), ReplayError> {
        let response = self
            .client
            .head(&self.endpoint)
            .send()
            .await
            .map_err(|e| ReplayError::LivenessCheck {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ReplayError::LivenessCheck {
                url: self.endpoint.clone(),
                reason: response.status().to_string(),
            });
        }
        debug!("Liveness check passed for {}", self.endpoint);
        Ok(())
    }

    /// Replay every entry of a fixture document.
    pub async fn replay(&self, document: &str) -> Result<ReplaySummary, ReplayError> {
        if self.options.check_up {
            self.check_up().await?;
        }

        let elements: Vec<Box<RawValue>> =
            serde_json::from_str(document).map_err(ReplayError::MalformedFixtureDocument)?;

        let counters = Arc::new(ReplayCounters::default());
        let permits = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut failures = Vec::new();
        let mut tasks = JoinSet::new();

        for (index, raw) in elements.iter().enumerate() {
            let case = match self.prepare(index, raw) {
                Ok(Some(case)) => case,
                Ok(None) => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Err(failure) => {
                    warn!("{}", failure);
                    counters.failure.fetch_add(1, Ordering::Relaxed);
                    failures.push(failure);
                    continue;
                }
            };

            let client = self.client.clone();
            let counters = Arc::clone(&counters);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = send_case(&client, &case).await;
                match &outcome {
                    Ok(()) => {
                        counters.success.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        counters.failure.fetch_add(1, Ordering::Relaxed);
                    }
                }
                outcome.err()
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(failure)) => {
                    warn!("{}", failure);
                    failures.push(failure);
                }
                Ok(None) => {}
                Err(e) => {
                    counters.failure.fetch_add(1, Ordering::Relaxed);
                    failures.push(ReplayFailure {
                        index: usize::MAX,
                        url: self.endpoint.clone(),
                        request: String::new(),
                        reason: format!("replay task failed: {e}"),
                    });
                }
            }
        }
        failures.sort_by_key(|f| f.index);

        let summary = ReplaySummary {
            success: counters.success.load(Ordering::SeqCst),
            failure: counters.failure.load(Ordering::SeqCst),
            skipped: counters.skipped.load(Ordering::SeqCst),
            failures,
        };
        info!(
            "Replay finished: {} succeeded, {} failed, {} skipped",
            summary.success, summary.failure, summary.skipped
        );
        Ok(summary)
    }

    /// Decode one element into a request to send. `Ok(None)` means the
    /// configured schemas reject it.
    fn prepare(&self, index: usize, raw: &RawValue) -> Result<Option<ReplayCase>, ReplayFailure> {
        let failure = |url: &str, request: &str, reason: String| ReplayFailure {
            index,
            url: url.to_string(),
            request: request.to_string(),
            reason,
        };

        let entry: FixtureEntry = serde_json::from_str(raw.get()).map_err(|e| {
            failure(&self.endpoint, raw.get(), format!("unable to decode fixture: {e}"))
        })?;
        let url = target_url(&self.endpoint, entry.selector());

        if let Some(schemas) = &self.schemas {
            if let Err(rejection) = FixtureCompiler::new(schemas).check_entry(&entry) {
                debug!("Skipping fixture #{}: {}", index, rejection);
                return Ok(None);
            }
        }

        let body = entry
            .request_text()
            .map_err(|e| e.to_string())
            .and_then(|text| canonicalize(&text).map_err(|e| e.to_string()))
            .map_err(|e| failure(&url, entry.req.get(), format!("request: {e}")))?;
        let expected = entry
            .response_text()
            .map_err(|e| e.to_string())
            .and_then(|text| canonicalize(&text).map_err(|e| e.to_string()))
            .map_err(|e| failure(&url, &body, format!("response: {e}")))?;

        Ok(Some(ReplayCase {
            index,
            url,
            body,
            expected,
        }))
    }
}

async fn send_case(client: &Client, case: &ReplayCase) -> Result<(), ReplayFailure> {
    let failure = |reason: String| ReplayFailure {
        index: case.index,
        url: case.url.clone(),
        request: case.body.clone(),
        reason,
    };

    let response = client
        .post(&case.url)
        .header("content-type", "application/json")
        .body(case.body.clone())
        .send()
        .await
        .map_err(|e| failure(e.to_string()))?;

    if response.status() != StatusCode::OK {
        return Err(failure(response.status().to_string()));
    }

    // Decompressed by the client when gzip is on
    let observed = response.text().await.map_err(|e| failure(e.to_string()))?;
    if responses_match(&observed, &case.expected) {
        Ok(())
    } else {
        Err(failure(format!(
            "received->{} expected->{}",
            observed, case.expected
        )))
    }
}

/// Case-insensitive exact comparison
pub fn responses_match(observed: &str, expected: &str) -> bool {
    observed == expected || observed.to_lowercase() == expected.to_lowercase()
}

/// Append a query selector to the endpoint, adding `?` or `&` as needed.
pub fn target_url(endpoint: &str, selector: &str) -> String {
    let selector = selector.trim_start_matches(['?', '&']);
    if selector.is_empty() {
        return endpoint.to_string();
    }
    if !endpoint.contains('?') {
        format!("{endpoint}?{selector}")
    } else if endpoint.ends_with('?') || endpoint.ends_with('&') {
        format!("{endpoint}{selector}")
    } else {
        format!("{endpoint}&{selector}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url() {
        assert_eq!(target_url("http://h/", ""), "http://h/");
        assert_eq!(target_url("http://h/", "id=5"), "http://h/?id=5");
        assert_eq!(target_url("http://h/end?", "id=5"), "http://h/end?id=5");
        assert_eq!(target_url("http://h/?debug", "id=5"), "http://h/?debug&id=5");
        assert_eq!(target_url("http://h/?debug&", "?id=5"), "http://h/?debug&id=5");
    }

    #[test]
    fn test_responses_match_ignores_case() {
        assert!(responses_match(r#"{"ok":true}"#, r#"{"ok":true}"#));
        assert!(responses_match(r#"{"OK":TRUE}"#, r#"{"ok":true}"#));
        assert!(!responses_match(r#"{"ok":true}"#, r#"{"ok": true}"#));
        assert!(!responses_match("", r#"{"ok":true}"#));
    }

    #[tokio::test]
    async fn test_malformed_document_is_fatal() {
        let options = ReplayOptions {
            check_up: false,
            ..Default::default()
        };
        let harness = ReplayHarness::new("http://127.0.0.1:9/", options).unwrap();
        let err = harness.replay(r#"{"req": 1}"#).await.unwrap_err();
        assert!(matches!(err, ReplayError::MalformedFixtureDocument(_)));
    }

    #[test]
    fn test_prepare_canonicalizes_payloads() {
        let harness = ReplayHarness::new("http://h/", ReplayOptions::default()).unwrap();
        let raw: Box<RawValue> = serde_json::from_str(
            r#"{"query": "id=5", "req": { "x" : 1 }, "res": "{ \"y\" : 2 }"}"#,
        )
        .unwrap();
        let case = harness.prepare(3, &raw).unwrap().unwrap();
        assert_eq!(case.index, 3);
        assert_eq!(case.url, "http://h/?id=5");
        assert_eq!(case.body, r#"{"x":1}"#);
        assert_eq!(case.expected, r#"{"y":2}"#);
    }

    #[test]
    fn test_prepare_repeated_key_keeps_last_value() {
        let harness = ReplayHarness::new("http://h/", ReplayOptions::default()).unwrap();
        let raw: Box<RawValue> =
            serde_json::from_str(r#"{"req": {"a": 1}, "res": {"n": 1}, "res": {"n": 2}}"#).unwrap();
        let case = harness.prepare(0, &raw).unwrap().unwrap();
        assert_eq!(case.body, r#"{"a":1}"#);
        assert_eq!(case.expected, r#"{"n":2}"#);
    }

    #[test]
    fn test_prepare_reports_undecodable_entry() {
        let harness = ReplayHarness::new("http://h/", ReplayOptions::default()).unwrap();
        let raw: Box<RawValue> = serde_json::from_str(r#"{"req": {}}"#).unwrap();
        let failure = harness.prepare(0, &raw).unwrap_err();
        assert!(failure.reason.contains("unable to decode fixture"));
    }

    #[test]
    fn test_prepare_skips_rejected_entries() {
        let schemas =
            SchemaSet::new(&serde_json::json!({"type": "array"}), &serde_json::json!({})).unwrap();
        let harness = ReplayHarness::new("http://h/", ReplayOptions::default())
            .unwrap()
            .with_schemas(schemas);
        let raw: Box<RawValue> = serde_json::from_str(r#"{"req": {}, "res": {}}"#).unwrap();
        assert!(harness.prepare(0, &raw).unwrap().is_none());
    }
}
