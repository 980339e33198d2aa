//! Hex encoding helpers for addresses and hashes.

use crate::entities::{Address, Hash};
use crate::errors::HexError;

/// Strip an optional `0x`/`0X` prefix.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex with or without prefix. An empty body decodes to no bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, HexError> {
    let body = strip_hex_prefix(s.trim());
    hex::decode(body).map_err(|e| HexError::InvalidHex(e.to_string()))
}

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a 20-byte address.
pub fn parse_address(s: &str) -> Result<Address, HexError> {
    parse_fixed::<20>(s)
}

/// Parse a 32-byte hash.
pub fn parse_hash(s: &str) -> Result<Hash, HexError> {
    parse_fixed::<32>(s)
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let bytes = decode_hex(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| HexError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}
