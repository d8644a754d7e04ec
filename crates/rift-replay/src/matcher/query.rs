//! Query-string normalization for fingerprint lookup.
//!
//! Parameter names are sorted so the key does not depend on the order they
//! arrived in; the values of a repeated parameter keep their arrival order
//! and are joined with `,`. A parameter written without `=` is a flag and
//! appears as its bare name. The debug parameter never takes part.

use std::collections::BTreeMap;

/// Separator between the values of a repeated parameter
pub const VALUE_SEPARATOR: char = ',';

/// Normalized query plus whether the debug parameter was present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryKey {
    pub key: String,
    pub debug: bool,
}

/// Build the query key from a raw (still percent-encoded) query string.
pub fn build_query_key(raw_query: Option<&str>, debug_parameter: &str) -> QueryKey {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut debug = false;

    for pair in raw_query.unwrap_or("").split('&').filter(|s| !s.is_empty()) {
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (decode_component(name), Some(decode_component(value))),
            None => (decode_component(pair), None),
        };

        if name == debug_parameter {
            debug = true;
            continue;
        }

        let values = params.entry(name).or_default();
        if let Some(value) = value {
            values.push(value);
        }
    }

    let mut key = String::new();
    for (name, values) in &params {
        if !key.is_empty() {
            key.push('&');
        }
        key.push_str(name);
        if !values.is_empty() {
            key.push('=');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    key.push(VALUE_SEPARATOR);
                }
                key.push_str(value);
            }
        }
    }

    QueryKey { key, debug }
}

/// Form-style decoding: `+` is a space, then percent-decoding. Invalid
/// UTF-8 is replaced rather than rejected so every query yields a key.
fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}
