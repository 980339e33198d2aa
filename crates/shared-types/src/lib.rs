//! # Shared Types Crate
//!
//! Entities that cross crate boundaries in the document integrity engine.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: digests, addresses, document records and
//!   transaction receipts are defined once, here.
//! - **Fixed-width keys**: the registry key is always a [`Digest32`]; a
//!   variable-length slice never stands in for it.

pub mod entities;
pub mod errors;
pub mod hex_format;

pub use entities::*;
pub use errors::*;
pub use hex_format::*;
