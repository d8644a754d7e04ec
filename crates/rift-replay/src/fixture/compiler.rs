//! Fixture compiler: fixture document -> `LookupTable`.
//!
//! Processing order for a document:
//! 1. Parse and validate the whole document against the meta-schema
//!    (failure: `MalformedFixtureDocument`).
//! 2. Decode each element in order (failure: `Decode`, aborts the load).
//! 3. Parse request then response payload and validate it against the
//!    operator schemas (failure: entry dropped, logged).
//! 4. Canonicalize both payloads (failure: entry dropped, logged).
//! 5. Insert `fingerprint -> response`, later entries overwriting earlier.
//!
//! An empty table at the end is `NoValidFixtures`.

use super::canonical::{canonicalize, CanonicalizeError};
use super::schema::SchemaSet;
use super::table::{LookupTable, TableBuilder};
use super::types::{CompileError, EntryRejection, FixtureEntry, Fingerprint, PayloadKind};
use crate::metrics;
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Compiles fixture documents against a fixed set of schemas.
#[derive(Debug)]
pub struct FixtureCompiler<'a> {
    schemas: &'a SchemaSet,
}

impl<'a> FixtureCompiler<'a> {
    pub fn new(schemas: &'a SchemaSet) -> Self {
        Self { schemas }
    }

    /// Compile a fixture document into a lookup table.
    pub fn compile(&self, document: &str) -> Result<LookupTable, CompileError> {
        let elements = self.decode_document(document)?;
        let mut builder = TableBuilder::new();

        for (index, raw) in elements.iter().enumerate() {
            let entry: FixtureEntry = serde_json::from_str(raw.get())
                .map_err(|source| CompileError::Decode { index, source })?;
            builder.entry_seen();

            if entry.selector().is_empty() {
                debug!("Fixture #{}: {} -> {}", index, entry.req, entry.res);
            } else {
                debug!(
                    "Fixture #{}: [{}] {} -> {}",
                    index,
                    entry.selector(),
                    entry.req,
                    entry.res
                );
            }

            match self.compile_entry(&entry) {
                Ok((fingerprint, response)) => {
                    if builder.insert(fingerprint.clone(), response) {
                        warn!(
                            "Fixture #{} overwrites an earlier fixture with fingerprint {}",
                            index, fingerprint
                        );
                    }
                }
                Err(rejection) => {
                    log_rejection(index, &rejection);
                    metrics::record_fixture_rejected(rejection.reason());
                    builder.entry_rejected();
                }
            }
        }

        let table = builder.build();
        if table.is_empty() {
            return Err(CompileError::NoValidFixtures {
                entries: table.stats().entries,
            });
        }

        let stats = table.stats();
        info!(
            "Compiled {} fixtures ({} entries, {} rejected, {} overwritten)",
            table.len(),
            stats.entries,
            stats.rejected,
            stats.overwritten
        );
        metrics::set_fixtures_loaded(table.len());
        Ok(table)
    }

    /// Check the document shape and split it into raw array elements.
    fn decode_document(&self, document: &str) -> Result<Vec<Box<RawValue>>, CompileError> {
        let value: Value = serde_json::from_str(document).map_err(|e| {
            CompileError::MalformedFixtureDocument(format!("not a JSON document: {e}"))
        })?;

        if let Err(errors) = self.schemas.validate_document(&value) {
            warn!("Fixture document is not valid. See errors:");
            for error in &errors {
                warn!("- {}", error);
            }
            return Err(CompileError::MalformedFixtureDocument(errors.join("; ")));
        }

        serde_json::from_str(document)
            .map_err(|e| CompileError::MalformedFixtureDocument(e.to_string()))
    }

    /// Run the per-entry checks without building a table.
    pub fn check_entry(&self, entry: &FixtureEntry) -> Result<(), EntryRejection> {
        self.compile_entry(entry).map(|_| ())
    }

    /// Validate and canonicalize one entry.
    fn compile_entry(&self, entry: &FixtureEntry) -> Result<(Fingerprint, String), EntryRejection> {
        let request = self.validated_text(PayloadKind::Request, entry.request_text())?;
        let response = self.validated_text(PayloadKind::Response, entry.response_text())?;

        let canonical_request =
            canonicalize(&request).map_err(|source| EntryRejection::CanonicalizationFailed {
                kind: PayloadKind::Request,
                source,
            })?;
        let canonical_response =
            canonicalize(&response).map_err(|source| EntryRejection::CanonicalizationFailed {
                kind: PayloadKind::Response,
                source,
            })?;

        Ok((
            Fingerprint::new(entry.selector(), &canonical_request),
            canonical_response,
        ))
    }

    /// Parse a payload and run it through its schema.
    ///
    /// Text that is not JSON is rejected as a canonicalization failure
    /// before any schema sees it.
    fn validated_text<S: AsRef<str>>(
        &self,
        kind: PayloadKind,
        text: Result<S, serde_json::Error>,
    ) -> Result<S, EntryRejection> {
        let text = text.map_err(|e| EntryRejection::CanonicalizationFailed {
            kind,
            source: CanonicalizeError::Json(e),
        })?;
        let instance: Value = serde_json::from_str(text.as_ref()).map_err(|e| {
            EntryRejection::CanonicalizationFailed {
                kind,
                source: CanonicalizeError::Json(e),
            }
        })?;
        self.schemas
            .validate_payload(kind, &instance)
            .map_err(|errors| EntryRejection::SchemaValidationFailed { kind, errors })?;
        Ok(text)
    }
}

fn log_rejection(index: usize, rejection: &EntryRejection) {
    match rejection {
        EntryRejection::SchemaValidationFailed { kind, errors } => {
            warn!("Fixture #{}: {} is not valid. See errors:", index, kind);
            for error in errors {
                warn!("- {}", error);
            }
            warn!("Fixture #{} will be ignored", index);
        }
        EntryRejection::CanonicalizationFailed { .. } => {
            warn!("Fixture #{}: {}. It will be ignored", index, rejection);
        }
    }
}
