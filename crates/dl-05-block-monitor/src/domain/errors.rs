//! # Monitor Errors

use dl_02_ledger_client::LedgerError;
use dl_04_transaction_tracker::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Receipt store error: {0}")]
    Store(#[from] StoreError),

    /// The node reported a head it cannot serve yet.
    #[error("Block {0} not available")]
    MissingBlock(u64),

    #[error("No receipt for {tx_hash} in block {block}")]
    MissingReceipt { block: u64, tx_hash: String },

    /// The monitor task panicked or was aborted.
    #[error("Monitor task failed: {0}")]
    Task(String),
}
