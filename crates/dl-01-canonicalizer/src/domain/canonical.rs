//! # Content Digests
//!
//! SHA-256 over the raw document bytes. The digest is the registry's
//! primary key, so the encoding must be stable across runs and platforms.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use shared_types::{decode_hex, Digest32, HexError};
use tracing::debug;

use super::errors::CanonicalError;

/// Width of a registry key in bytes.
pub const DIGEST_LEN: usize = 32;

const READ_CHUNK: usize = 64 * 1024;

/// Hash raw document content.
pub fn hash(content: &[u8]) -> Digest32 {
    Digest32::new(Sha256::digest(content).into())
}

/// Hash content from a reader without buffering it whole.
pub fn hash_reader<R: Read>(mut reader: R) -> Result<Digest32, CanonicalError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest32::new(hasher.finalize().into()))
}

/// Hash the binary content of a file.
pub fn hash_file(path: impl AsRef<Path>) -> Result<Digest32, CanonicalError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let digest = hash_reader(BufReader::new(file))?;
    debug!(path = %path.display(), digest = %digest, "Hashed document");
    Ok(digest)
}

/// Decode a hex digest (optional `0x` prefix) into a registry key.
///
/// # Errors
///
/// - [`CanonicalError::InvalidHex`] when the input is not hex
/// - [`CanonicalError::InvalidKeyLength`] when it does not decode to
///   exactly [`DIGEST_LEN`] bytes
pub fn encode_key(hex_digest: &str) -> Result<Digest32, CanonicalError> {
    let bytes = decode_hex(hex_digest).map_err(|e| match e {
        HexError::InvalidHex(msg) => CanonicalError::InvalidHex(msg),
        other => CanonicalError::InvalidHex(other.to_string()),
    })?;

    let key: [u8; DIGEST_LEN] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CanonicalError::InvalidKeyLength {
            actual: bytes.len(),
        })?;

    Ok(Digest32::new(key))
}
