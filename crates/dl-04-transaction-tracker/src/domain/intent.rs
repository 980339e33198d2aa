//! # Intents and Unsigned Transactions
//!
//! ```text
//! TransactionIntent ──build──→ UnsignedTransaction ──sign──→ raw bytes ──submit──→ TxHash
//!     (per user action)          (+ nonce, gas, chain id)
//! ```
//!
//! An intent is consumed once it is signed and submitted. A retry is a new
//! intent with a new nonce.

use std::fmt;

use dl_02_ledger_client::{LegacyTransaction, RegistryCall};
use primitive_types::U256;
use shared_types::{Address, Digest32};

/// Gas limit for a document operation.
pub const DEFAULT_DOCUMENT_GAS_LIMIT: u64 = 2_000_000;
/// Gas limit for the contract deployment.
pub const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 4_000_000;
/// 50 gwei.
pub const DEFAULT_GAS_PRICE_WEI: u64 = 50_000_000_000;

/// State-changing registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub operation: OperationKind,
    pub content_hash: Digest32,
    pub name: String,
    pub doc_type: String,
}

impl TransactionIntent {
    pub fn add(content_hash: Digest32, name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            operation: OperationKind::Add,
            content_hash,
            name: name.into(),
            doc_type: doc_type.into(),
        }
    }

    pub fn update(
        content_hash: Digest32,
        name: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            operation: OperationKind::Update,
            content_hash,
            name: name.into(),
            doc_type: doc_type.into(),
        }
    }

    pub fn delete(content_hash: Digest32) -> Self {
        Self {
            operation: OperationKind::Delete,
            content_hash,
            name: String::new(),
            doc_type: String::new(),
        }
    }

    /// The contract call this intent turns into.
    pub fn to_call(&self) -> RegistryCall {
        let digest = self.content_hash;
        match self.operation {
            OperationKind::Add => RegistryCall::Add {
                digest,
                name: self.name.clone(),
                doc_type: self.doc_type.clone(),
            },
            OperationKind::Update => RegistryCall::Update {
                digest,
                name: self.name.clone(),
                doc_type: self.doc_type.clone(),
            },
            OperationKind::Delete => RegistryCall::Delete { digest },
        }
    }
}

/// Where the gas price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPrice {
    /// Configured price in wei.
    Fixed(U256),
    /// Ask the node at build time.
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    pub document_gas_limit: u64,
    pub deploy_gas_limit: u64,
    pub price: GasPrice,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            document_gas_limit: DEFAULT_DOCUMENT_GAS_LIMIT,
            deploy_gas_limit: DEFAULT_DEPLOY_GAS_LIMIT,
            price: GasPrice::Fixed(U256::from(DEFAULT_GAS_PRICE_WEI)),
        }
    }
}

/// What an unsigned transaction does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Document {
        operation: OperationKind,
        content_hash: Digest32,
    },
    Deploy,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document {
                operation,
                content_hash,
            } => write!(f, "{} {}", operation, content_hash.short()),
            Self::Deploy => f.write_str("deploy"),
        }
    }
}

/// A built transaction waiting for a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub kind: TransactionKind,
    pub chain_id: u64,
    pub tx: LegacyTransaction,
}

impl UnsignedTransaction {
    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    pub fn target(&self) -> Option<Address> {
        self.tx.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_to_call() {
        let digest = Digest32::new([9; 32]);
        assert_eq!(
            TransactionIntent::add(digest, "contract.pdf", "legal").to_call(),
            RegistryCall::Add {
                digest,
                name: "contract.pdf".into(),
                doc_type: "legal".into()
            }
        );
        assert_eq!(
            TransactionIntent::delete(digest).to_call(),
            RegistryCall::Delete { digest }
        );
    }

    #[test]
    fn test_default_gas_policy() {
        let policy = GasPolicy::default();
        assert_eq!(policy.document_gas_limit, 2_000_000);
        assert_eq!(policy.deploy_gas_limit, 4_000_000);
        assert_eq!(policy.price, GasPrice::Fixed(U256::from(50_000_000_000u64)));
    }

    #[test]
    fn test_kind_display() {
        let kind = TransactionKind::Document {
            operation: OperationKind::Update,
            content_hash: Digest32::new([0xAB; 32]),
        };
        assert_eq!(kind.to_string(), "update 0xabababab…");
        assert_eq!(TransactionKind::Deploy.to_string(), "deploy");
    }
}
