//! # Adapters Layer
//!
//! - `json_rpc`: [`JsonRpcLedgerClient`], HTTP JSON-RPC to a real node
//! - `simulator`: [`SimulatedLedger`], in-memory node for tests (`simulator` feature)

pub mod json_rpc;
#[cfg(any(test, feature = "simulator"))]
pub mod simulator;

pub use json_rpc::JsonRpcLedgerClient;
#[cfg(any(test, feature = "simulator"))]
pub use simulator::SimulatedLedger;
