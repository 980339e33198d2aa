//! Outbound port for receipt persistence.

use shared_types::{TransactionReceipt, TxHash};

use crate::domain::StoreError;

/// Port: durable receipt log keyed by transaction hash.
///
/// Rows are immutable. Inserting a hash that is already present leaves the
/// existing row untouched, so the tracker and the block monitor can both
/// record the same transaction without coordination.
pub trait ReceiptStore: Send + Sync {
    /// Insert unless a row for the hash exists. Returns `true` when inserted.
    fn insert_if_absent(&self, receipt: &TransactionReceipt) -> Result<bool, StoreError>;

    fn get(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>, StoreError>;

    fn contains(&self, tx_hash: &TxHash) -> Result<bool, StoreError> {
        Ok(self.get(tx_hash)?.is_some())
    }

    fn count(&self) -> Result<u64, StoreError>;

    /// Most recent receipts first (highest block).
    fn recent(&self, limit: usize) -> Result<Vec<TransactionReceipt>, StoreError>;
}
