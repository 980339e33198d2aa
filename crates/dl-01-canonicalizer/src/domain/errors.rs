//! # Canonicalization Errors

use thiserror::Error;

/// Errors raised while hashing content or encoding registry keys.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Decoded key is not exactly 32 bytes.
    #[error("Invalid key length: {actual} bytes, expected 32")]
    InvalidKeyLength { actual: usize },

    /// Key is not valid hex.
    #[error("Invalid hex key: {0}")]
    InvalidHex(String),

    /// Document content could not be read.
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}
