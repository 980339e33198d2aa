//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Keys**: `Digest32`, `Address`, `TxHash`
//! - **Registry**: `DocumentRecord`
//! - **Observability**: `TransactionReceipt`, `ReceiptStatus`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::HexError;
use crate::hex_format::{decode_hex, to_prefixed_hex};

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: KEYS
// =============================================================================

/// A 32-byte hash (Keccak-256 transaction hashes, block hashes).
pub type Hash = [u8; 32];

/// A ledger transaction hash.
pub type TxHash = Hash;

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Fixed-width content digest, the primary key of the document registry.
///
/// Holds exactly 32 bytes; there is no way to build one from a slice of
/// another length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Digest32(pub [u8; 32]);

impl Digest32 {
    /// Wrap raw digest bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Lowercase hex with `0x` prefix.
    pub fn to_prefixed_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }

    /// Abbreviated form for log lines (`0x2cf24dba…`).
    pub fn short(&self) -> String {
        format!("0x{}…", hex::encode(&self.0[..4]))
    }
}

impl From<[u8; 32]> for Digest32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest32({})", self.to_hex())
    }
}

// =============================================================================
// CLUSTER B: REGISTRY
// =============================================================================

/// Ledger-resident record of a registered document.
///
/// At most one live record exists per `content_hash`. A deleted record is
/// kept as a tombstone (`exists == false`) and its key is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Content digest, immutable once set.
    pub content_hash: Digest32,
    /// Address of the signer that registered the document.
    pub issuer: Address,
    /// Human-readable document name.
    pub name: String,
    /// Free-form document type.
    pub doc_type: String,
    /// Ledger timestamp of the registration (seconds since epoch).
    pub registered_at: u64,
    /// Tombstone flag.
    pub exists: bool,
}

// =============================================================================
// CLUSTER C: OBSERVABILITY
// =============================================================================

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Failed,
    Pending,
}

impl ReceiptStatus {
    /// Map the ledger's numeric receipt status (`1` = success).
    pub fn from_ledger_status(status: u64) -> Self {
        if status == 1 {
            Self::Success
        } else {
            Self::Failed
        }
    }

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptStatus {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Older stores carry Polish labels
            "SUCCESS" | "SUKCES" => Ok(Self::Success),
            "FAILED" | "BŁĄD" => Ok(Self::Failed),
            "PENDING" => Ok(Self::Pending),
            other => Err(HexError::InvalidLabel(other.to_string())),
        }
    }
}

/// Persisted, immutable record of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Unique key.
    pub tx_hash: TxHash,
    /// Transaction sender.
    pub sender: Address,
    /// Call target; `None` for contract creation.
    pub recipient: Option<Address>,
    /// Gas consumed by execution.
    pub gas_used: u64,
    /// Execution status.
    pub status: ReceiptStatus,
    /// Timestamp of the containing block.
    pub block_timestamp: u64,
    /// Number of the containing block.
    pub block_number: u64,
}

impl TransactionReceipt {
    /// `true` when the transaction executed without reverting.
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// `0x`-prefixed transaction hash.
    pub fn tx_hash_hex(&self) -> String {
        to_prefixed_hex(&self.tx_hash)
    }
}

impl FromStr for Digest32 {
    type Err = HexError;

    /// Strict parse: exactly 32 bytes of hex, optional `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HexError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}
