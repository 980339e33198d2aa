//! # Ledger Errors
//!
//! Every adapter method surfaces failures through [`LedgerError`]. Nothing at
//! this layer retries; the caller owns retry policy.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a ledger client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The node could not be reached (refused, DNS, transport timeout).
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node answered with something that is not a valid response.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Contract execution reverted.
    #[error("Execution reverted: {}", reason.as_deref().unwrap_or("<no reason>"))]
    Reverted { reason: Option<String> },

    /// No receipt appeared before the deadline. The transaction may still
    /// be mined later.
    #[error("No receipt for {tx_hash} after {waited:?}")]
    ConfirmationTimeout { tx_hash: String, waited: Duration },
}

impl LedgerError {
    /// Transport-level failure.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Request/response-level failure (error object or malformed payload).
    pub fn is_rpc(&self) -> bool {
        matches!(self, Self::Rpc { .. } | Self::MalformedResponse(_))
    }

    /// Revert reason, if this is a revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            Self::Reverted { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

/// Errors from the ABI and RLP codecs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// RLP structure is invalid.
    #[error("RLP decode error: {0}")]
    Rlp(String),

    /// ABI payload is truncated or malformed.
    #[error("ABI decode error: {0}")]
    Abi(String),

    /// Calldata selector is not part of the contract surface.
    #[error("Unknown function selector 0x{0}")]
    UnknownSelector(String),

    /// Signature cannot be parsed or the signer cannot be recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

impl From<rlp::DecoderError> for CodecError {
    fn from(e: rlp::DecoderError) -> Self {
        Self::Rlp(e.to_string())
    }
}

impl From<CodecError> for LedgerError {
    fn from(e: CodecError) -> Self {
        Self::MalformedResponse(e.to_string())
    }
}
