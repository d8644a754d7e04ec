//! Whitespace-only JSON canonicalization.
//!
//! The canonical form of a JSON text is the same text with every
//! insignificant whitespace byte removed. Nothing else changes: object keys
//! keep the order they were written in, numbers keep their spelling
//! (`1.0` stays `1.0`), and string contents are copied untouched.
//! Two payloads that differ only in key order therefore canonicalize to
//! different strings.

use serde::de::IgnoredAny;
use thiserror::Error;

/// Reasons a payload cannot be canonicalized.
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Canonicalize a JSON text.
///
/// Fails if the input is not exactly one syntactically valid JSON value.
pub fn canonicalize(text: &str) -> Result<String, CanonicalizeError> {
    serde_json::from_str::<IgnoredAny>(text)?;
    Ok(strip_whitespace(text))
}

/// Canonicalize a raw request body.
pub fn canonicalize_bytes(bytes: &[u8]) -> Result<String, CanonicalizeError> {
    let text = std::str::from_utf8(bytes)?;
    canonicalize(text)
}

/// Drop JSON whitespace outside of string literals.
///
/// Only called on text that already parsed as JSON, so the string/escape
/// tracking never sees an unterminated literal.
fn strip_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            ' ' | '\t' | '\n' | '\r' => {}
            '"' => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
