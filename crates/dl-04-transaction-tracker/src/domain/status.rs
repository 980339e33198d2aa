//! Query results for submitted transactions.

use std::fmt;

use dl_02_ledger_client::RpcReceipt;
use shared_types::{to_prefixed_hex, Address, ReceiptStatus, TransactionReceipt, TxHash};

/// Where a transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Failed,
    /// Known to the node, not mined.
    Pending,
    /// Neither stored nor known to the node.
    Unknown,
}

impl From<ReceiptStatus> for TransactionStatus {
    fn from(status: ReceiptStatus) -> Self {
        match status {
            ReceiptStatus::Success => Self::Success,
            ReceiptStatus::Failed => Self::Failed,
            ReceiptStatus::Pending => Self::Pending,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Everything the ledger knows about one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDetails {
    pub tx_hash: TxHash,
    pub sender: Address,
    pub recipient: Option<Address>,
    pub gas_limit: u64,
    pub nonce: u64,
    pub status: TransactionStatus,
    /// `None` until mined.
    pub gas_used: Option<u64>,
    pub log_count: usize,
    pub block_number: Option<u64>,
    pub block_timestamp: Option<u64>,
    /// Transactions in the containing block.
    pub block_transaction_count: Option<usize>,
}

impl fmt::Display for TransactionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transaction:  {}", to_prefixed_hex(&self.tx_hash))?;
        writeln!(f, "Status:       {}", self.status)?;
        writeln!(f, "From:         {}", to_prefixed_hex(&self.sender))?;
        match &self.recipient {
            Some(to) => writeln!(f, "To:           {}", to_prefixed_hex(to))?,
            None => writeln!(f, "To:           (contract creation)")?,
        }
        writeln!(f, "Nonce:        {}", self.nonce)?;
        writeln!(f, "Gas limit:    {}", self.gas_limit)?;
        if let Some(gas_used) = self.gas_used {
            writeln!(f, "Gas used:     {}", gas_used)?;
        }
        writeln!(f, "Logs:         {}", self.log_count)?;
        if let (Some(number), Some(ts)) = (self.block_number, self.block_timestamp) {
            write!(f, "Block:        #{} at {}", number, ts)?;
            if let Some(count) = self.block_transaction_count {
                write!(f, " ({} transactions)", count)?;
            }
        }
        Ok(())
    }
}

/// Build the persisted receipt from a node receipt and its block timestamp.
///
/// A receipt without a status field (pre-Byzantium) counts as success.
pub fn receipt_from_rpc(rpc: &RpcReceipt, block_timestamp: u64) -> TransactionReceipt {
    TransactionReceipt {
        tx_hash: rpc.transaction_hash,
        sender: rpc.from,
        recipient: rpc.to,
        gas_used: rpc.gas_used,
        status: rpc
            .status
            .map(ReceiptStatus::from_ledger_status)
            .unwrap_or(ReceiptStatus::Success),
        block_timestamp,
        block_number: rpc.block_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(status: Option<u64>) -> RpcReceipt {
        RpcReceipt {
            transaction_hash: [1; 32],
            from: [2; 20],
            to: None,
            gas_used: 500_000,
            status,
            block_number: 4,
            block_hash: [3; 32],
            contract_address: Some([4; 20]),
            logs: Vec::new(),
        }
    }

    #[test]
    fn test_receipt_from_rpc() {
        let receipt = receipt_from_rpc(&rpc(Some(0)), 1_700_000_004);
        assert_eq!(receipt.status, ReceiptStatus::Failed);
        assert_eq!(receipt.block_timestamp, 1_700_000_004);
        assert_eq!(receipt.recipient, None);
        assert_eq!(receipt_from_rpc(&rpc(None), 0).status, ReceiptStatus::Success);
    }

    #[test]
    fn test_details_display() {
        let details = TransactionDetails {
            tx_hash: [1; 32],
            sender: [2; 20],
            recipient: None,
            gas_limit: 4_000_000,
            nonce: 0,
            status: TransactionStatus::Pending,
            gas_used: None,
            log_count: 0,
            block_number: None,
            block_timestamp: None,
            block_transaction_count: None,
        };
        let text = details.to_string();
        assert!(text.contains("PENDING"));
        assert!(text.contains("(contract creation)"));
        assert!(!text.contains("Block:"));
    }
}
