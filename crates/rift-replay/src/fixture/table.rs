//! Immutable fingerprint -> response table.
//!
//! The table is filled by the compiler and then frozen: it exposes no
//! mutating methods, so once it is wrapped in an `Arc` and handed to the
//! request handlers, concurrent reads need no locking.

use super::types::Fingerprint;
use bytes::Bytes;
use std::collections::HashMap;

/// Counters describing how a fixture document was compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Entries decoded from the document
    pub entries: usize,
    /// Entries inserted into the table (including ones later overwritten)
    pub accepted: usize,
    /// Entries dropped by schema validation or canonicalization
    pub rejected: usize,
    /// Accepted entries that replaced an earlier entry with the same fingerprint
    pub overwritten: usize,
}

/// Fingerprint to canonical response payload.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    responses: HashMap<Fingerprint, Bytes>,
    stats: CompileStats,
}

impl LookupTable {
    /// Look up the stored response for a fingerprint
    pub fn get(&self, fingerprint: &str) -> Option<&Bytes> {
        self.responses.get(fingerprint)
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.responses.contains_key(fingerprint)
    }

    /// Number of distinct fingerprints
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn stats(&self) -> CompileStats {
        self.stats
    }

    /// Iterate over all fingerprints (order unspecified)
    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.responses.keys()
    }
}

/// Write side of the table, only reachable from the compiler.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
    table: LookupTable,
}

impl TableBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entry_seen(&mut self) {
        self.table.stats.entries += 1;
    }

    pub(crate) fn entry_rejected(&mut self) {
        self.table.stats.rejected += 1;
    }

    /// Insert with last-write-wins semantics. Returns true when an earlier
    /// entry was replaced.
    pub(crate) fn insert(&mut self, fingerprint: Fingerprint, response: String) -> bool {
        self.table.stats.accepted += 1;
        let replaced = self
            .table
            .responses
            .insert(fingerprint, Bytes::from(response))
            .is_some();
        if replaced {
            self.table.stats.overwritten += 1;
        }
        replaced
    }

    pub(crate) fn build(self) -> LookupTable {
        self.table
    }
}
