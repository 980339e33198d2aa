//! # Ports Layer
//!
//! - `ledger`: the outbound port every other subsystem talks to the ledger through

pub mod ledger;

pub use ledger::LedgerClient;
