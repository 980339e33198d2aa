//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Errors raised while parsing hex-encoded identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HexError {
    /// The input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded byte length does not match the expected width.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// An unknown textual label (e.g. a receipt status) was encountered.
    #[error("Unknown label: {0}")]
    InvalidLabel(String),
}
