//! # Registry Errors

use dl_01_canonicalizer::CanonicalError;
use dl_02_ledger_client::LedgerError;
use dl_04_transaction_tracker::TrackerError;
use thiserror::Error;

/// Errors from the document registry protocol.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The key is malformed. Raised locally, before any ledger call.
    #[error("Invalid registry key: {0}")]
    InvalidKey(#[from] CanonicalError),

    /// A live record already exists for the digest.
    #[error("Document {digest} is already registered")]
    AlreadyExists { digest: String },

    /// No live record exists for the digest.
    #[error("Document {digest} is not registered")]
    NotFound { digest: String },

    /// The contract rejected the operation for a reason the revert table
    /// does not map.
    #[error(
        "Transaction failed{}: {}",
        tx_hash.as_ref().map(|h| format!(" ({})", h)).unwrap_or_default(),
        reason.as_deref().unwrap_or("no revert reason")
    )]
    TransactionFailed {
        tx_hash: Option<String>,
        reason: Option<String>,
    },

    /// The session has no registry contract address.
    #[error("No registry contract configured")]
    NoContract,

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
