//! # SQLite Receipt Store
//!
//! ## Table
//!
//! ```sql
//! transactions(tx_hash TEXT PRIMARY KEY, sender TEXT, recipient TEXT,
//!              gas_used INTEGER, status TEXT, timestamp INTEGER, block_number INTEGER)
//! ```
//!
//! Hashes and addresses are stored as `0x`-prefixed lowercase hex. A
//! contract creation has a `NULL` recipient. The primary key makes
//! `INSERT OR IGNORE` the insert-if-absent primitive.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use shared_types::{parse_address, parse_hash, to_prefixed_hex, ReceiptStatus, TransactionReceipt, TxHash};
use tracing::{debug, info, warn};

use crate::domain::StoreError;
use crate::ports::ReceiptStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    tx_hash      TEXT PRIMARY KEY,
    sender       TEXT NOT NULL,
    recipient    TEXT,
    gas_used     INTEGER NOT NULL,
    status       TEXT NOT NULL,
    timestamp    INTEGER NOT NULL,
    block_number INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_block ON transactions(block_number);
";

const SELECT_COLUMNS: &str =
    "SELECT tx_hash, sender, recipient, gas_used, status, timestamp, block_number FROM transactions";

/// Receipt store backed by a SQLite file.
pub struct SqliteReceiptStore {
    conn: Mutex<Connection>,
}

impl SqliteReceiptStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("[dl-04] Opening receipt database at {}", path.display());

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("[dl-04] Opening in-memory receipt database");
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }
}

struct RawRow {
    tx_hash: String,
    sender: String,
    recipient: Option<String>,
    gas_used: i64,
    status: String,
    timestamp: i64,
    block_number: i64,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            tx_hash: row.get(0)?,
            sender: row.get(1)?,
            recipient: row.get(2)?,
            gas_used: row.get(3)?,
            status: row.get(4)?,
            timestamp: row.get(5)?,
            block_number: row.get(6)?,
        })
    }

    fn into_receipt(self) -> Result<TransactionReceipt, StoreError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            StoreError::Corrupt(format!("{} of {}: {}", field, self.tx_hash, e))
        };
        Ok(TransactionReceipt {
            tx_hash: parse_hash(&self.tx_hash).map_err(|e| corrupt("tx_hash", &e))?,
            sender: parse_address(&self.sender).map_err(|e| corrupt("sender", &e))?,
            recipient: self
                .recipient
                .as_deref()
                .map(parse_address)
                .transpose()
                .map_err(|e| corrupt("recipient", &e))?,
            gas_used: self.gas_used as u64,
            status: self
                .status
                .parse::<ReceiptStatus>()
                .map_err(|e| corrupt("status", &e))?,
            block_timestamp: self.timestamp as u64,
            block_number: self.block_number as u64,
        })
    }
}

impl ReceiptStore for SqliteReceiptStore {
    fn insert_if_absent(&self, receipt: &TransactionReceipt) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO transactions
                 (tx_hash, sender, recipient, gas_used, status, timestamp, block_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    receipt.tx_hash_hex(),
                    to_prefixed_hex(&receipt.sender),
                    receipt.recipient.as_ref().map(|r| to_prefixed_hex(r)),
                    receipt.gas_used as i64,
                    receipt.status.as_str(),
                    receipt.block_timestamp as i64,
                    receipt.block_number as i64,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    fn get(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{} WHERE tx_hash = ?1", SELECT_COLUMNS),
                    params![to_prefixed_hex(tx_hash)],
                    RawRow::read,
                )
                .optional()?;
            row.map(RawRow::into_receipt).transpose()
        })
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    fn recent(&self, limit: usize) -> Result<Vec<TransactionReceipt>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} ORDER BY block_number DESC, rowid DESC LIMIT ?1",
                SELECT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], RawRow::read)?
                .collect::<Result<Vec<_>, _>>()?;
            // Listings skip rows that no longer parse
            Ok(rows
                .into_iter()
                .filter_map(|row| match row.into_receipt() {
                    Ok(receipt) => Some(receipt),
                    Err(e) => {
                        warn!(error = %e, "[dl-04] Skipping unreadable receipt row");
                        None
                    }
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(seed: u8, block_number: u64) -> TransactionReceipt {
        TransactionReceipt {
            tx_hash: [seed; 32],
            sender: [0xF3; 20],
            recipient: Some([0x5F; 20]),
            gas_used: 90_000,
            status: ReceiptStatus::Success,
            block_timestamp: 1_700_000_000 + block_number,
            block_number,
        }
    }

    #[test]
    fn test_duplicate_insert_leaves_one_row() {
        let store = SqliteReceiptStore::open_in_memory().unwrap();
        let first = receipt(1, 1);
        assert!(store.insert_if_absent(&first).unwrap());

        let mut altered = first.clone();
        altered.status = ReceiptStatus::Failed;
        assert!(!store.insert_if_absent(&altered).unwrap());

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(&first.tx_hash).unwrap(), Some(first));
    }

    #[test]
    fn test_contract_creation_has_null_recipient() {
        let store = SqliteReceiptStore::open_in_memory().unwrap();
        let mut deploy = receipt(2, 3);
        deploy.recipient = None;
        store.insert_if_absent(&deploy).unwrap();
        assert_eq!(store.get(&deploy.tx_hash).unwrap().unwrap().recipient, None);
        assert!(store.contains(&deploy.tx_hash).unwrap());
        assert!(!store.contains(&[0xEE; 32]).unwrap());
    }

    #[test]
    fn test_recent_orders_by_block() {
        let store = SqliteReceiptStore::open_in_memory().unwrap();
        for (seed, block) in [(1u8, 5u64), (2, 9), (3, 7)] {
            store.insert_if_absent(&receipt(seed, block)).unwrap();
        }
        let recent = store.recent(2).unwrap();
        let blocks: Vec<u64> = recent.iter().map(|r| r.block_number).collect();
        assert_eq!(blocks, vec![9, 7]);
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logi").join("blockchain_logs.db");
        {
            let store = SqliteReceiptStore::open(&path).unwrap();
            store.insert_if_absent(&receipt(4, 1)).unwrap();
        }
        let store = SqliteReceiptStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get(&[4; 32]).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_row_reported_by_get_and_skipped_by_listing() {
        let store = SqliteReceiptStore::open_in_memory().unwrap();
        store.insert_if_absent(&receipt(1, 1)).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO transactions VALUES ('0x0202020202020202020202020202020202020202020202020202020202020202', '0xbad', NULL, 1, 'SUCCESS', 1, 2)",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO transactions VALUES ('0x0303030303030303030303030303030303030303030303030303030303030303', '0xf3f3f3f3f3f3f3f3f3f3f3f3f3f3f3f3f3f3f3f3', NULL, 1, 'BŁĄD', 1, 3)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(store.get(&[2; 32]), Err(StoreError::Corrupt(_))));

        let recent = store.recent(10).unwrap();
        let hashes: Vec<TxHash> = recent.iter().map(|r| r.tx_hash).collect();
        assert_eq!(hashes, vec![[3; 32], [1; 32]]);
        assert_eq!(recent[0].status, ReceiptStatus::Failed);
        assert_eq!(store.count().unwrap(), 3);
    }
}
