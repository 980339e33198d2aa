//! # Tracker Errors

use std::time::Duration;

use dl_02_ledger_client::LedgerError;
use thiserror::Error;

/// Errors from the transaction lifecycle.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The private key cannot be parsed.
    #[error("Invalid signing key: {0}")]
    InvalidCredential(String),

    /// Signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The node refused the signed transaction (nonce, funds, chain id).
    /// Never retried.
    #[error("Submission rejected: {message}")]
    SubmissionError { message: String },

    /// Execution reverted at submission time.
    #[error("Execution reverted: {}", reason.as_deref().unwrap_or("<no reason>"))]
    Reverted { reason: Option<String> },

    /// No receipt before the deadline. The transaction stays pending and
    /// may still be mined.
    #[error("Transaction {tx_hash} not confirmed after {waited:?}")]
    ConfirmationTimeout { tx_hash: String, waited: Duration },

    /// The ledger does not know the transaction.
    #[error("Transaction {0} not found")]
    UnknownTransaction(String),

    /// The transaction exists but has no receipt yet.
    #[error("Transaction {0} is not mined yet")]
    NotMined(String),

    /// The session has no registry contract address.
    #[error("No registry contract configured for this session")]
    NoContract,

    /// A contract creation did not produce a contract.
    #[error("Deployment {tx_hash} failed")]
    DeploymentFailed { tx_hash: String },

    /// Any other adapter failure (connectivity, malformed responses).
    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    /// Map an error from `eth_sendRawTransaction`. Node rejections become
    /// [`TrackerError::SubmissionError`].
    pub fn from_submission(e: LedgerError) -> Self {
        match e {
            LedgerError::Rpc { code, message } => Self::SubmissionError {
                message: format!("{} (code {})", message, code),
            },
            other => other.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_connectivity())
    }
}

impl From<LedgerError> for TrackerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Reverted { reason } => Self::Reverted { reason },
            LedgerError::ConfirmationTimeout { tx_hash, waited } => {
                Self::ConfirmationTimeout { tx_hash, waited }
            }
            other => Self::Ledger(other),
        }
    }
}

/// Errors from a receipt store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt receipt row: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_rejection_is_submission_error() {
        let err = TrackerError::from_submission(LedgerError::Rpc {
            code: -32000,
            message: "nonce too low".into(),
        });
        assert!(matches!(err, TrackerError::SubmissionError { ref message } if message.contains("nonce too low")));
    }

    #[test]
    fn test_connectivity_passes_through() {
        let err = TrackerError::from_submission(LedgerError::Connectivity("refused".into()));
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_revert_and_timeout_are_lifted() {
        let err: TrackerError = LedgerError::Reverted {
            reason: Some("Document already exists".into()),
        }
        .into();
        assert!(matches!(err, TrackerError::Reverted { reason: Some(_) }));

        let err: TrackerError = LedgerError::ConfirmationTimeout {
            tx_hash: "0x01".into(),
            waited: Duration::from_secs(1),
        }
        .into();
        assert!(matches!(err, TrackerError::ConfirmationTimeout { .. }));
    }
}
