//! # Transaction Lifecycle Tracker (dl-04)
//!
//! Owns every state-changing interaction with the ledger: nonce allocation,
//! signing, submission, confirmation and receipt persistence.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | One nonce, one transaction | `SubmissionSlot` serializes read-nonce → build → sign → submit |
//! | Rejected submissions are surfaced | `TrackerError::SubmissionError`, never retried |
//! | Receipts are immutable | `ReceiptStore::insert_if_absent` |
//! | Timeouts keep the transaction | `ConfirmationTimeout` carries the hash for a later `status`/`record` |
//!
//! ## Module Structure
//!
//! ```text
//! domain/    credential, intents, gas policy, status, errors
//! ports/     ReceiptStore
//! adapters/  SqliteReceiptStore, InMemoryReceiptStore
//! service/   TransactionTracker
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryReceiptStore, SqliteReceiptStore};
pub use domain::*;
pub use ports::ReceiptStore;
pub use service::*;
