//! # Ledger Client Adapter (dl-02)
//!
//! ## Purpose
//!
//! The only place the engine talks to the ledger node. Everything above this
//! crate sees the [`LedgerClient`] port and the typed wire shapes; raw
//! JSON-RPC, ABI words and RLP stay down here.
//!
//! ## Error Surface
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `Connectivity` | Node unreachable, transport timeout |
//! | `Rpc` | JSON-RPC error object (nonce, funds, chain id) |
//! | `MalformedResponse` | Response does not parse |
//! | `Reverted` | Contract execution reverted; reason decoded when present |
//! | `ConfirmationTimeout` | `wait_for_receipt` deadline passed |
//!
//! No method retries. Retry policy belongs to the caller.
//!
//! ## Module Structure
//!
//! ```text
//! domain/
//!   abi.rs          - selectors, head/tail encoding, Error(string)
//!   contract.rs     - registry calls and verifyDocument output
//!   transaction.rs  - EIP-155 legacy transactions, sender recovery
//!   revert.rs       - revert reason extraction, RevertTable
//!   wire.rs         - JSON-RPC receipt/transaction/block shapes
//! ports/
//!   ledger.rs       - LedgerClient trait
//! adapters/
//!   json_rpc.rs     - reqwest JSON-RPC client
//!   simulator.rs    - in-memory ledger (feature `simulator`)
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::JsonRpcLedgerClient;
#[cfg(any(test, feature = "simulator"))]
pub use adapters::SimulatedLedger;
pub use domain::*;
pub use ports::LedgerClient;
