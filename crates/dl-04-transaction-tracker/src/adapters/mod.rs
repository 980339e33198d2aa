//! # Adapters Layer
//!
//! Receipt store implementations.

pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::InMemoryReceiptStore;
pub use sqlite_store::SqliteReceiptStore;
