//! # Domain Layer
//!
//! - `credential`: signing key and session
//! - `intent`: intents, gas policy, unsigned transactions
//! - `status`: status and detail queries
//! - `errors`: tracker and store errors

pub mod credential;
pub mod errors;
pub mod intent;
pub mod status;

pub use credential::{LedgerSession, SigningCredential};
pub use errors::{StoreError, TrackerError};
pub use intent::{
    GasPolicy, GasPrice, OperationKind, TransactionIntent, TransactionKind, UnsignedTransaction,
    DEFAULT_DEPLOY_GAS_LIMIT, DEFAULT_DOCUMENT_GAS_LIMIT, DEFAULT_GAS_PRICE_WEI,
};
pub use status::{receipt_from_rpc, TransactionDetails, TransactionStatus};
