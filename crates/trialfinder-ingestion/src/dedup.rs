//! Deduplication of normalised trials by NCT identifier.
//!
//! Pagination can hand back the same study twice when the registry is
//! updated mid-scan; the first occurrence wins.

use std::collections::HashSet;

/// Result of a deduplication check.
#[derive(Debug, PartialEq)]
pub enum DedupResult {
    /// Identifier not seen before; keep the record.
    New,
    /// Identifier already present in this result set.
    DuplicateId(String),
}

/// Identifiers seen so far in one result set.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check an identifier and remember it. Comparison ignores case.
    pub fn check_and_insert(&mut self, nct_id: &str) -> DedupResult {
        let key = nct_id.trim().to_uppercase();
        if self.seen.insert(key) {
            DedupResult::New
        } else {
            DedupResult::DuplicateId(nct_id.to_string())
        }
    }
}
