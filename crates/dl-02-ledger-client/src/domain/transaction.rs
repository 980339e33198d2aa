//! # Legacy Transaction Codec (EIP-155)
//!
//! Signed transactions are RLP lists:
//!
//! ```text
//! unsigned: [nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]
//! signed:   [nonce, gasPrice, gasLimit, to, value, data, v, r, s]
//! v = recoveryId + 2 * chainId + 35
//! ```
//!
//! The signing hash is `keccak256(rlp(unsigned))`; the transaction hash is
//! `keccak256(rlp(signed))`.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use primitive_types::U256;
use rlp::{Rlp, RlpStream};
use sha3::{Digest, Keccak256};
use shared_types::{Address, Hash, TxHash};

use super::errors::CodecError;

/// Keccak-256.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the Ethereum address of a public key (last 20 bytes of the
/// Keccak-256 of the uncompressed point without its `0x04` prefix).
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Address of a contract created by `sender` at `nonce`.
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender.to_vec());
    stream.append(&nonce);
    let hash = keccak256(&stream.out());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// The `(v, r, s)` triple of a signed legacy transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureParts {
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl SignatureParts {
    /// Build from a recoverable signature under EIP-155.
    pub fn eip155(recovery_id: u8, r: [u8; 32], s: [u8; 32], chain_id: u64) -> Self {
        Self {
            v: u64::from(recovery_id) + chain_id * 2 + 35,
            r,
            s,
        }
    }

    /// Split `v` into `(recovery id, chain id)`. Pre-EIP-155 `v` (27/28)
    /// yields no chain id.
    pub fn recovery(&self) -> Result<(u8, Option<u64>), CodecError> {
        match self.v {
            27 | 28 => Ok(((self.v - 27) as u8, None)),
            v if v >= 35 => Ok((((v - 35) % 2) as u8, Some((v - 35) / 2))),
            v => Err(CodecError::InvalidSignature(format!("invalid v value {}", v))),
        }
    }
}

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => stream.append(&to.to_vec()),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// Hash the signer signs over.
    pub fn signing_hash(&self, chain_id: u64) -> Hash {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(&stream.out())
    }

    /// Raw signed transaction bytes, ready for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, signature: &SignatureParts) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&signature.v);
        stream.append(&U256::from_big_endian(&signature.r));
        stream.append(&U256::from_big_endian(&signature.s));
        stream.out().to_vec()
    }

    /// Decode raw signed transaction bytes.
    pub fn decode_signed(raw: &[u8]) -> Result<(Self, SignatureParts), CodecError> {
        let rlp = Rlp::new(raw);
        if !rlp.is_list() || rlp.item_count()? != 9 {
            return Err(CodecError::Rlp(
                "expected a 9-item legacy transaction list".into(),
            ));
        }

        let to_bytes: Vec<u8> = rlp.val_at(3)?;
        let to = match to_bytes.len() {
            0 => None,
            20 => {
                let mut addr = [0u8; 20];
                addr.copy_from_slice(&to_bytes);
                Some(addr)
            }
            n => return Err(CodecError::Rlp(format!("recipient is {} bytes", n))),
        };

        let tx = Self {
            nonce: rlp.val_at(0)?,
            gas_price: rlp.val_at(1)?,
            gas_limit: rlp.val_at(2)?,
            to,
            value: rlp.val_at(4)?,
            data: rlp.val_at(5)?,
        };

        let r: U256 = rlp.val_at(7)?;
        let s: U256 = rlp.val_at(8)?;
        let mut signature = SignatureParts {
            v: rlp.val_at(6)?,
            r: [0u8; 32],
            s: [0u8; 32],
        };
        r.to_big_endian(&mut signature.r);
        s.to_big_endian(&mut signature.s);

        Ok((tx, signature))
    }
}

/// Hash of raw signed transaction bytes.
pub fn transaction_hash(raw: &[u8]) -> TxHash {
    keccak256(raw)
}

/// Recover the sender of a signed transaction. Returns the sender and the
/// chain id the signature commits to.
pub fn recover_sender(
    tx: &LegacyTransaction,
    signature: &SignatureParts,
) -> Result<(Address, Option<u64>), CodecError> {
    let (recovery_byte, chain_id) = signature.recovery()?;

    let signing_hash = match chain_id {
        Some(id) => tx.signing_hash(id),
        None => {
            let mut stream = RlpStream::new_list(6);
            tx.append_body(&mut stream);
            keccak256(&stream.out())
        }
    };

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&sig_bytes)
        .map_err(|e| CodecError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| CodecError::InvalidSignature("bad recovery id".into()))?;

    let key = VerifyingKey::recover_from_prehash(&signing_hash, &sig, recovery_id)
        .map_err(|e| CodecError::InvalidSignature(e.to_string()))?;

    Ok((address_from_verifying_key(&key), chain_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    // Well-known development key #0 (Hardhat / Anvil)
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "f39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn dev_key() -> SigningKey {
        let bytes = hex::decode(DEV_KEY).unwrap();
        SigningKey::from_slice(&bytes).unwrap()
    }

    fn sample_tx() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 7,
            gas_price: U256::from(50_000_000_000u64),
            gas_limit: 2_000_000,
            to: Some([0x5F; 20]),
            value: U256::zero(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    fn sign(tx: &LegacyTransaction, chain_id: u64) -> SignatureParts {
        let (sig, recid) = dev_key()
            .sign_prehash_recoverable(&tx.signing_hash(chain_id))
            .unwrap();
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        SignatureParts::eip155(recid.to_byte(), r, s, chain_id)
    }

    #[test]
    fn test_dev_key_address() {
        let address = address_from_verifying_key(dev_key().verifying_key());
        assert_eq!(hex::encode(address), DEV_ADDRESS);
    }

    #[test]
    fn test_keccak_empty_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_signed_decode_recovers_sender() {
        let tx = sample_tx();
        let signature = sign(&tx, 31337);
        let raw = tx.encode_signed(&signature);

        let (decoded, decoded_sig) = LegacyTransaction::decode_signed(&raw).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded_sig, signature);

        let (sender, chain_id) = recover_sender(&decoded, &decoded_sig).unwrap();
        assert_eq!(hex::encode(sender), DEV_ADDRESS);
        assert_eq!(chain_id, Some(31337));
    }

    #[test]
    fn test_contract_creation_has_empty_recipient() {
        let mut tx = sample_tx();
        tx.to = None;
        let raw = tx.encode_signed(&sign(&tx, 1));
        let (decoded, _) = LegacyTransaction::decode_signed(&raw).unwrap();
        assert_eq!(decoded.to, None);
    }

    #[test]
    fn test_tampered_payload_changes_sender() {
        let tx = sample_tx();
        let signature = sign(&tx, 1);
        let mut tampered = tx.clone();
        tampered.nonce += 1;
        let recovered = recover_sender(&tampered, &signature).map(|(a, _)| a);
        assert_ne!(recovered.ok().map(hex::encode), Some(DEV_ADDRESS.to_string()));
    }

    #[test]
    fn test_eip155_v_split() {
        let parts = SignatureParts::eip155(1, [1; 32], [2; 32], 31337);
        assert_eq!(parts.v, 1 + 31337 * 2 + 35);
        assert_eq!(parts.recovery().unwrap(), (1, Some(31337)));
        let legacy = SignatureParts { v: 27, ..parts };
        assert_eq!(legacy.recovery().unwrap(), (0, None));
        let bad = SignatureParts { v: 30, ..parts };
        assert!(bad.recovery().is_err());
    }

    #[test]
    fn test_known_contract_address() {
        // First contract deployed by the dev account on a fresh chain
        let sender: Address = hex::decode(DEV_ADDRESS).unwrap().try_into().unwrap();
        assert_eq!(
            hex::encode(contract_address(&sender, 0)),
            "5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(LegacyTransaction::decode_signed(&[0xc0]).is_err());
        assert!(LegacyTransaction::decode_signed(b"not rlp").is_err());
    }
}
