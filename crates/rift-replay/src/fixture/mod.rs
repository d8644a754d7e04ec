//! Fixture loading: document decoding, schema gating, canonicalization and
//! the immutable lookup table.
//!
//! ## Module Structure
//!
//! - `types`: Fixture entry, fingerprint, error taxonomy
//! - `canonical`: Whitespace-only JSON canonicalization
//! - `schema`: Compiled draft-04 schemas
//! - `table`: Frozen fingerprint -> response table
//! - `compiler`: `FixtureCompiler` tying the above together

mod canonical;
mod compiler;
mod schema;
mod table;
mod types;

pub use canonical::{canonicalize, canonicalize_bytes, CanonicalizeError};
pub use compiler::FixtureCompiler;
pub use schema::{SchemaError, SchemaSet, FIXTURE_DOCUMENT_SCHEMA};
pub use table::{CompileStats, LookupTable};
pub use types::{
    payload_text, CompileError, EntryRejection, Fingerprint, FixtureEntry, PayloadKind,
};
