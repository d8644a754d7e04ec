//! Request-time matching against the compiled lookup table.
//!
//! - `query`: Query-key normalization and debug flag detection
//! - `engine`: `MatchEngine` producing a `MatchResult` per request

mod engine;
mod query;

pub use engine::{IncomingRequest, MatchEngine, MatchResult};
pub use query::{build_query_key, QueryKey, VALUE_SEPARATOR};
