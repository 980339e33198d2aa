//! Verification result.

use shared_types::{Digest32, DocumentRecord};

/// Outcome of re-deriving a document's digest and reading its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub digest: Digest32,
    /// `true` only when a live record exists for the digest.
    pub matched: bool,
    /// Ledger metadata; tombstones included, `None` when never registered.
    pub record: Option<DocumentRecord>,
}

impl Verification {
    pub fn unregistered(digest: Digest32) -> Self {
        Self {
            digest,
            matched: false,
            record: None,
        }
    }

    pub fn from_record(record: DocumentRecord) -> Self {
        Self {
            digest: record.content_hash,
            matched: record.exists,
            record: Some(record),
        }
    }

    /// `true` when a record exists but was deleted.
    pub fn is_tombstone(&self) -> bool {
        matches!(&self.record, Some(r) if !r.exists)
    }
}
