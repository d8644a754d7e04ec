//! Prometheus metrics for rift-replay.
//!
//! Tracks fixture loading and per-request match outcomes.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests answered, by match outcome
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "rift_replay_requests_total",
        "Total number of requests processed by the stub",
        &["outcome"]  // outcome: hit|no_match|empty_request|malformed_body|body_read_failure|liveness
    )
    .unwrap();

    /// Request handling duration
    pub static ref REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "rift_replay_request_duration_ms",
        "Histogram of request handling time in milliseconds",
        &["outcome"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0]
    )
    .unwrap();

    /// Distinct fingerprints in the lookup table
    pub static ref FIXTURES_LOADED: Gauge = register_gauge!(
        "rift_replay_fixtures_loaded",
        "Number of distinct fixtures in the lookup table"
    )
    .unwrap();

    /// Fixture entries dropped at load time
    pub static ref FIXTURES_REJECTED_TOTAL: CounterVec = register_counter_vec!(
        "rift_replay_fixtures_rejected_total",
        "Total number of fixture entries dropped during compilation",
        &["reason"]  // reason: schema|canonicalization
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# failed to encode metrics: {e}\n");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record a handled request
pub fn record_request(outcome: &str, duration_ms: f64) {
    REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    REQUEST_DURATION_MS
        .with_label_values(&[outcome])
        .observe(duration_ms);
}

/// Helper to set the loaded fixture gauge
pub fn set_fixtures_loaded(count: usize) {
    FIXTURES_LOADED.set(count as f64);
}

/// Helper to record a dropped fixture entry
pub fn record_fixture_rejected(reason: &str) {
    FIXTURES_REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        record_request("hit", 0.3);
        record_fixture_rejected("schema");
        set_fixtures_loaded(3);

        let metrics = collect_metrics();
        assert!(metrics.contains("rift_replay_requests_total"));
        assert!(metrics.contains("rift_replay_fixtures_rejected_total"));
        assert!(metrics.contains("rift_replay_fixtures_loaded"));
    }
}
