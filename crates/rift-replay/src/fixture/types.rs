//! Type definitions for fixture compilation.
//!
//! This module contains the fixture entry as decoded from the document,
//! the fingerprint key type, and the compile-time error taxonomy.

use super::canonical::CanonicalizeError;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::borrow::{Borrow, Cow};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Fixture Entry
// ============================================================================

/// One recorded request/response pair from the fixture document.
///
/// Payloads are kept as raw JSON text so that key order and number
/// spelling survive exactly as written. A key repeated within one entry
/// keeps its last value; unknown keys are ignored.
#[derive(Debug)]
pub struct FixtureEntry {
    /// Raw query-string fragment distinguishing otherwise-identical bodies
    pub query: Option<String>,
    pub req: Box<RawValue>,
    pub res: Box<RawValue>,
}

impl<'de> Deserialize<'de> for FixtureEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, IgnoredAny, Visitor};

        struct FixtureEntryVisitor;

        impl<'de> Visitor<'de> for FixtureEntryVisitor {
            type Value = FixtureEntry;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a fixture object with `req` and `res`")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: de::MapAccess<'de>,
            {
                let mut query = None;
                let mut req = None;
                let mut res = None;

                // Later occurrences overwrite earlier ones
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "query" => query = map.next_value::<Option<String>>()?,
                        "req" => req = Some(map.next_value::<Box<RawValue>>()?),
                        "res" => res = Some(map.next_value::<Box<RawValue>>()?),
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }

                Ok(FixtureEntry {
                    query,
                    req: req.ok_or_else(|| de::Error::missing_field("req"))?,
                    res: res.ok_or_else(|| de::Error::missing_field("res"))?,
                })
            }
        }

        deserializer.deserialize_map(FixtureEntryVisitor)
    }
}

impl FixtureEntry {
    /// Query selector, empty when absent
    pub fn selector(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// JSON text of the request payload
    pub fn request_text(&self) -> Result<Cow<'_, str>, serde_json::Error> {
        payload_text(&self.req)
    }

    /// JSON text of the response payload
    pub fn response_text(&self) -> Result<Cow<'_, str>, serde_json::Error> {
        payload_text(&self.res)
    }
}

/// Resolve the JSON text a payload stands for.
///
/// A JSON string holds embedded JSON text (legacy fixture format) and is
/// unescaped; any other value is its own text.
pub fn payload_text(raw: &RawValue) -> Result<Cow<'_, str>, serde_json::Error> {
    let text = raw.get();
    if text.trim_start().starts_with('"') {
        let embedded: String = serde_json::from_str(text)?;
        Ok(Cow::Owned(embedded))
    } else {
        Ok(Cow::Borrowed(text))
    }
}

/// Which side of a fixture a payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Request,
    Response,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Request => "request",
            PayloadKind::Response => "response",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Lookup key for a request: `[selector]` prefix (when non-empty) followed
/// by the canonical request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(selector: &str, canonical_body: &str) -> Self {
        if selector.is_empty() {
            return Self(canonical_body.to_string());
        }
        let mut key = String::with_capacity(selector.len() + canonical_body.len() + 2);
        key.push('[');
        key.push_str(selector);
        key.push(']');
        key.push_str(canonical_body);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Fingerprint {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal compilation errors. Any of these stops the service from starting.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Malformed fixture document: {0}")]
    MalformedFixtureDocument(String),
    #[error("Unable to decode fixture entry #{index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("No valid fixtures: all {entries} entries were rejected")]
    NoValidFixtures { entries: usize },
}

/// Why a single entry was dropped. Never fatal to the load.
#[derive(Debug, Error)]
pub enum EntryRejection {
    #[error("{kind} payload failed schema validation: {}", .errors.join("; "))]
    SchemaValidationFailed {
        kind: PayloadKind,
        errors: Vec<String>,
    },
    #[error("{kind} payload could not be canonicalized: {source}")]
    CanonicalizationFailed {
        kind: PayloadKind,
        #[source]
        source: CanonicalizeError,
    },
}

impl EntryRejection {
    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            EntryRejection::SchemaValidationFailed { .. } => "schema",
            EntryRejection::CanonicalizationFailed { .. } => "canonicalization",
        }
    }
}
