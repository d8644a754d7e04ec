//! Match engine: live request -> pre-recorded response.

use super::query::build_query_key;
use crate::config::ReplayConfig;
use crate::fixture::{canonicalize_bytes, Fingerprint, LookupTable};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

/// The parts of an HTTP request that take part in matching.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    /// Fully buffered request body
    pub body: Bytes,
}

impl IncomingRequest {
    pub fn new(query: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            query: query.map(str::to_string),
            body: body.into(),
        }
    }
}

/// Outcome of matching one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Stored response, served as `application/json`
    Hit(Bytes),
    /// No fixture has this fingerprint
    NoMatch,
    /// Request had no body; nothing was looked up
    EmptyRequest,
    /// Body is not a JSON document
    MalformedBody(String),
}

impl MatchResult {
    /// Label used in logs and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            MatchResult::Hit(_) => "hit",
            MatchResult::NoMatch => "no_match",
            MatchResult::EmptyRequest => "empty_request",
            MatchResult::MalformedBody(_) => "malformed_body",
        }
    }
}

/// Answers requests from a frozen lookup table.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    table: Arc<LookupTable>,
    debug_parameter: String,
    forced_debug: bool,
}

impl MatchEngine {
    pub fn new(
        table: Arc<LookupTable>,
        debug_parameter: impl Into<String>,
        forced_debug: bool,
    ) -> Self {
        Self {
            table,
            debug_parameter: debug_parameter.into(),
            forced_debug,
        }
    }

    pub fn from_config(table: Arc<LookupTable>, config: &ReplayConfig) -> Self {
        Self::new(table, config.debug_parameter.clone(), config.forced_debug)
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    /// Whether a query string turns on debug tracing for its request
    pub fn is_debug(&self, query: Option<&str>) -> bool {
        self.forced_debug || build_query_key(query, &self.debug_parameter).debug
    }

    /// Match one request against the table.
    pub fn handle(&self, request: &IncomingRequest) -> MatchResult {
        let query = build_query_key(request.query.as_deref(), &self.debug_parameter);
        let debug = query.debug || self.forced_debug;
        if debug {
            info!("Query: {}", query.key);
        }

        if request.body.is_empty() {
            if debug {
                info!("Empty request body received");
            }
            return MatchResult::EmptyRequest;
        }

        if debug {
            info!("Body received: {}", String::from_utf8_lossy(&request.body));
        }

        let canonical = match canonicalize_bytes(&request.body) {
            Ok(canonical) => canonical,
            Err(e) => {
                if debug {
                    info!("Body is not JSON: {}", e);
                }
                return MatchResult::MalformedBody(e.to_string());
            }
        };

        let fingerprint = Fingerprint::new(&query.key, &canonical);
        let result = match self.table.get(fingerprint.as_str()) {
            Some(response) => MatchResult::Hit(response.clone()),
            None => MatchResult::NoMatch,
        };

        if debug {
            match &result {
                MatchResult::Hit(response) => {
                    info!("Sent back: {}", String::from_utf8_lossy(response))
                }
                _ => info!("Key not found in lookup table: {}", fingerprint),
            }
            info!("Processed request of {} bytes", request.body.len());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureCompiler, SchemaSet};
    use serde_json::json;
    use tracing_test::traced_test;

    fn engine(document: &str) -> MatchEngine {
        let schemas = SchemaSet::new(&json!({}), &json!({})).unwrap();
        let table = FixtureCompiler::new(&schemas).compile(document).unwrap();
        MatchEngine::new(Arc::new(table), "debug", false)
    }

    fn hit(body: &str) -> MatchResult {
        MatchResult::Hit(Bytes::from(body.to_string()))
    }

    #[test]
    fn test_exact_body_hits() {
        let engine = engine(r#"[{"req":{"a":1,"b":2},"res":{"ok":true}}]"#);
        let result = engine.handle(&IncomingRequest::new(None, r#"{"a":1,"b":2}"#));
        assert_eq!(result, hit(r#"{"ok":true}"#));
    }

    #[test]
    fn test_whitespace_variants_hit() {
        let engine = engine(r#"[{"req":{"a":1,"b":2},"res":{"ok":true}}]"#);
        for body in [
            "{ \"a\": 1, \"b\": 2 }",
            "{\n\t\"a\":1,\n\t\"b\":2\n}\n",
            "  {\"a\" :1 , \"b\": 2}",
        ] {
            let result = engine.handle(&IncomingRequest::new(None, body));
            assert_eq!(result, hit(r#"{"ok":true}"#), "body {body:?}");
        }
    }

    #[test]
    fn test_reordered_keys_miss() {
        let engine = engine(r#"[{"req":{"a":1,"b":2},"res":{"ok":true}}]"#);
        let result = engine.handle(&IncomingRequest::new(None, r#"{"b":2,"a":1}"#));
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn test_query_selector() {
        let engine = engine(r#"[{"query":"id=5","req":{"x":1},"res":{"id":5}}]"#);

        let result = engine.handle(&IncomingRequest::new(Some("id=5"), r#"{"x":1}"#));
        assert_eq!(result, hit(r#"{"id":5}"#));

        let result = engine.handle(&IncomingRequest::new(Some("id=6"), r#"{"x":1}"#));
        assert_eq!(result, MatchResult::NoMatch);

        let result = engine.handle(&IncomingRequest::new(None, r#"{"x":1}"#));
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn test_parameter_order_does_not_matter() {
        let engine = engine(r#"[{"query":"a=1&b=2","req":{},"res":1}]"#);
        assert_eq!(engine.handle(&IncomingRequest::new(Some("b=2&a=1"), "{}")), hit("1"));
        assert_eq!(engine.handle(&IncomingRequest::new(Some("a=1&b=2"), "{}")), hit("1"));
    }

    #[test]
    fn test_debug_parameter_does_not_affect_matching() {
        let engine = engine(r#"[{"query":"id=5","req":{"x":1},"res":{"id":5}}]"#);
        let result = engine.handle(&IncomingRequest::new(Some("debug&id=5"), r#"{"x":1}"#));
        assert_eq!(result, hit(r#"{"id":5}"#));
    }

    #[test]
    fn test_empty_body() {
        let engine = engine(r#"[{"req":{},"res":{}}]"#);
        let result = engine.handle(&IncomingRequest::new(None, Bytes::new()));
        assert_eq!(result, MatchResult::EmptyRequest);
        assert_eq!(engine.table().len(), 1);
    }

    #[test]
    fn test_malformed_body() {
        let engine = engine(r#"[{"req":{},"res":{}}]"#);
        let result = engine.handle(&IncomingRequest::new(None, "{not json"));
        assert!(matches!(result, MatchResult::MalformedBody(_)));
        assert_eq!(result.outcome(), "malformed_body");
    }

    #[test]
    #[traced_test]
    fn test_debug_mode_traces_request() {
        let engine = engine(r#"[{"req":{"x":1},"res":{"y":2}}]"#);
        engine.handle(&IncomingRequest::new(Some("debug"), r#"{"x":1}"#));
        assert!(logs_contain("Body received: {\"x\":1}"));
        assert!(logs_contain("Sent back: {\"y\":2}"));
    }

    #[test]
    #[traced_test]
    fn test_forced_debug() {
        let schemas = SchemaSet::new(&json!({}), &json!({})).unwrap();
        let table = FixtureCompiler::new(&schemas)
            .compile(r#"[{"req":{"x":1},"res":{"y":2}}]"#)
            .unwrap();
        let engine = MatchEngine::new(Arc::new(table), "debug", true);
        assert!(engine.is_debug(None));

        let result = engine.handle(&IncomingRequest::new(None, r#"{"x":2}"#));
        assert_eq!(result, MatchResult::NoMatch);
        assert!(logs_contain("Key not found in lookup table"));
    }
}
