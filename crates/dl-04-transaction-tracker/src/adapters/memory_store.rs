//! In-memory receipt store.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::{TransactionReceipt, TxHash};

use crate::domain::StoreError;
use crate::ports::ReceiptStore;

#[derive(Default)]
struct Inner {
    index: HashMap<TxHash, usize>,
    rows: Vec<TransactionReceipt>,
}

/// Receipt store held in process memory. Contents are lost on exit.
#[derive(Default)]
pub struct InMemoryReceiptStore {
    inner: RwLock<Inner>,
}

impl InMemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReceiptStore for InMemoryReceiptStore {
    fn insert_if_absent(&self, receipt: &TransactionReceipt) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&receipt.tx_hash) {
            return Ok(false);
        }
        let position = inner.rows.len();
        inner.index.insert(receipt.tx_hash, position);
        inner.rows.push(receipt.clone());
        Ok(true)
    }

    fn get(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.index.get(tx_hash).map(|&i| inner.rows[i].clone()))
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().rows.len() as u64)
    }

    fn recent(&self, limit: usize) -> Result<Vec<TransactionReceipt>, StoreError> {
        let inner = self.inner.read();
        let mut rows: Vec<(usize, &TransactionReceipt)> = inner.rows.iter().enumerate().collect();
        rows.sort_by(|(ia, a), (ib, b)| b.block_number.cmp(&a.block_number).then(ib.cmp(ia)));
        Ok(rows.into_iter().take(limit).map(|(_, r)| r.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ReceiptStatus;
    use std::sync::Arc;

    fn receipt(seed: u8, block_number: u64) -> TransactionReceipt {
        TransactionReceipt {
            tx_hash: [seed; 32],
            sender: [1; 20],
            recipient: None,
            gas_used: 21_000,
            status: ReceiptStatus::Success,
            block_timestamp: block_number,
            block_number,
        }
    }

    #[test]
    fn test_insert_if_absent() {
        let store = InMemoryReceiptStore::new();
        assert!(store.insert_if_absent(&receipt(1, 1)).unwrap());
        assert!(!store.insert_if_absent(&receipt(1, 2)).unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(&[1; 32]).unwrap().unwrap().block_number, 1);
    }

    #[test]
    fn test_recent_newest_first() {
        let store = InMemoryReceiptStore::new();
        store.insert_if_absent(&receipt(1, 4)).unwrap();
        store.insert_if_absent(&receipt(2, 4)).unwrap();
        store.insert_if_absent(&receipt(3, 2)).unwrap();
        let order: Vec<u8> = store.recent(10).unwrap().iter().map(|r| r.tx_hash[0]).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn test_concurrent_inserts_keep_one_row() {
        let store = Arc::new(InMemoryReceiptStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.insert_if_absent(&receipt(9, 1)).unwrap())
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.count().unwrap(), 1);
    }
}
