//! # Document Registry (dl-03)
//!
//! The registry protocol on top of the ledger contract.
//!
//! ## Record Lifecycle
//!
//! ```text
//! Absent ──add──→ Active ──update──→ Active
//!                   │
//!                   └──delete──→ Deleted (tombstone, terminal)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | One live record per digest | contract rejects a second `add`, surfaced as `AlreadyExists` |
//! | Keys are never reused | `add` on a tombstone is rejected the same way |
//! | Signer is the issuer | the contract records `msg.sender`; the registry never passes an issuer |
//! | Malformed keys stay local | `verify_by_key` runs `encode_key` before any call |
//! | Verification is read-only | `verify_*` uses `eth_call`, never a transaction |
//!
//! ## Module Structure
//!
//! ```text
//! domain/   RegistryError, Verification
//! service/  DocumentRegistry
//! ```

pub mod domain;
pub mod service;

pub use domain::{RegistryError, Verification};
pub use service::DocumentRegistry;
