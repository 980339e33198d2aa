//! # Domain Layer
//!
//! Pure encoding logic for the ledger wire formats. No I/O.
//!
//! - `abi`: contract call encoding
//! - `contract`: the document registry contract surface
//! - `transaction`: legacy (EIP-155) signed transaction codec
//! - `revert`: revert reason extraction and the rejection table
//! - `wire`: JSON-RPC response shapes

pub mod abi;
pub mod contract;
pub mod errors;
pub mod revert;
pub mod transaction;
pub mod wire;

pub use abi::{ParamType, Token};
pub use contract::{RegistryCall, VerifyOutput};
pub use errors::{CodecError, LedgerError};
pub use revert::{revert_reason_from_rpc, ContractRejection, RevertTable};
pub use transaction::{
    address_from_verifying_key, contract_address, keccak256, recover_sender, transaction_hash,
    LegacyTransaction, SignatureParts,
};
pub use wire::{BlockTag, BlockTransactions, CallRequest, RpcBlock, RpcReceipt, RpcTransaction};
