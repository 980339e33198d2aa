//! # Canonicalizer (dl-01)
//!
//! Deterministic content hashing for the document registry.
//!
//! ## Responsibilities
//!
//! - Compute the SHA-256 digest of a document's raw bytes
//! - Encode hex digests into the fixed-width registry key
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Same bytes, same digest | `hash` depends on content only, never on name or type |
//! | Fixed-width keys | `encode_key` rejects anything that is not exactly 32 bytes |
//!
//! Both checks run locally. Nothing in this crate touches the network, so
//! a malformed key is rejected before any ledger call is attempted.

pub mod domain;

pub use domain::canonical::{encode_key, hash, hash_file, hash_reader, DIGEST_LEN};
pub use domain::errors::CanonicalError;
pub use shared_types::Digest32;
