//! # Signing Credential and Session
//!
//! One secp256k1 key per process, held for the session and never persisted.
//! The key bytes are zeroized on drop and never printed.

use std::fmt;

use dl_02_ledger_client::{address_from_verifying_key, LedgerClient, LegacyTransaction, SignatureParts};
use k256::ecdsa::SigningKey;
use shared_types::{decode_hex, to_prefixed_hex, Address};
use zeroize::Zeroizing;

use super::errors::TrackerError;

/// A private key and its derived address.
pub struct SigningCredential {
    /// `SigningKey` zeroizes its scalar on drop.
    key: SigningKey,
    address: Address,
}

impl SigningCredential {
    /// Build from raw 32-byte key material.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrackerError> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|_| TrackerError::InvalidCredential("not a valid secp256k1 scalar".into()))?;
        Ok(Self::from_key(key))
    }

    /// Build from hex, with or without `0x`.
    pub fn from_hex(hex_key: &str) -> Result<Self, TrackerError> {
        let bytes = Zeroizing::new(
            decode_hex(hex_key).map_err(|_| TrackerError::InvalidCredential("key is not hex".into()))?,
        );
        if bytes.len() != 32 {
            return Err(TrackerError::InvalidCredential(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_bytes(&bytes)
    }

    /// Fresh random key.
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::thread_rng()))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign under EIP-155 and return the raw transaction bytes.
    pub fn sign(&self, tx: &LegacyTransaction, chain_id: u64) -> Result<Vec<u8>, TrackerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&tx.signing_hash(chain_id))
            .map_err(|e| TrackerError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        let parts = SignatureParts::eip155(recovery_id.to_byte(), r, s, chain_id);
        Ok(tx.encode_signed(&parts))
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("address", &to_prefixed_hex(&self.address))
            .field("key", &"***")
            .finish()
    }
}

/// Everything a signer needs besides the ledger connection.
#[derive(Debug)]
pub struct LedgerSession {
    credential: SigningCredential,
    chain_id: u64,
    contract: Option<Address>,
}

impl LedgerSession {
    pub fn new(credential: SigningCredential, chain_id: u64) -> Self {
        Self {
            credential,
            chain_id,
            contract: None,
        }
    }

    /// Ask the node for its chain id.
    pub async fn connect(
        credential: SigningCredential,
        ledger: &dyn LedgerClient,
    ) -> Result<Self, TrackerError> {
        let chain_id = ledger.chain_id().await?;
        Ok(Self::new(credential, chain_id))
    }

    /// Registry contract calls are sent to.
    pub fn with_contract(mut self, contract: Address) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn credential(&self) -> &SigningCredential {
        &self.credential
    }

    pub fn sender(&self) -> Address {
        self.credential.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contract(&self) -> Option<Address> {
        self.contract
    }
}
