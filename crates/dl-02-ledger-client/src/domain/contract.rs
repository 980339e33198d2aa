//! # Document Registry Contract Surface
//!
//! ```text
//! addDocument(bytes32 hash, string name, string docType)
//! updateDocument(bytes32 hash, string name, string docType)
//! deleteDocument(bytes32 hash)
//! verifyDocument(bytes32 hash) -> (bool exists, address issuer,
//!                                  uint256 timestamp, string name, string docType)
//! ```

use primitive_types::U256;
use shared_types::{Address, Digest32, DocumentRecord};

use super::abi::{self, ParamType, Token};
use super::errors::CodecError;

pub const ADD_DOCUMENT: &str = "addDocument(bytes32,string,string)";
pub const UPDATE_DOCUMENT: &str = "updateDocument(bytes32,string,string)";
pub const DELETE_DOCUMENT: &str = "deleteDocument(bytes32)";
pub const VERIFY_DOCUMENT: &str = "verifyDocument(bytes32)";

/// Revert reason for a duplicate registration.
pub const REASON_ALREADY_EXISTS: &str = "Document already exists";
/// Revert reason for an operation on a missing or deleted record.
pub const REASON_DOES_NOT_EXIST: &str = "Document does not exist";

const VERIFY_OUTPUT: [ParamType; 5] = [
    ParamType::Bool,
    ParamType::Address,
    ParamType::Uint256,
    ParamType::String,
    ParamType::String,
];

/// A call against the registry contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Add {
        digest: Digest32,
        name: String,
        doc_type: String,
    },
    Update {
        digest: Digest32,
        name: String,
        doc_type: String,
    },
    Delete {
        digest: Digest32,
    },
    Verify {
        digest: Digest32,
    },
}

impl RegistryCall {
    /// The registry key the call targets.
    pub fn digest(&self) -> &Digest32 {
        match self {
            Self::Add { digest, .. }
            | Self::Update { digest, .. }
            | Self::Delete { digest }
            | Self::Verify { digest } => digest,
        }
    }

    /// Solidity function name, for log lines.
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "addDocument",
            Self::Update { .. } => "updateDocument",
            Self::Delete { .. } => "deleteDocument",
            Self::Verify { .. } => "verifyDocument",
        }
    }

    /// ABI calldata.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Add {
                digest,
                name,
                doc_type,
            } => abi::encode_call(ADD_DOCUMENT, &metadata_tokens(digest, name, doc_type)),
            Self::Update {
                digest,
                name,
                doc_type,
            } => abi::encode_call(UPDATE_DOCUMENT, &metadata_tokens(digest, name, doc_type)),
            Self::Delete { digest } => {
                abi::encode_call(DELETE_DOCUMENT, &[Token::FixedBytes32(digest.0)])
            }
            Self::Verify { digest } => {
                abi::encode_call(VERIFY_DOCUMENT, &[Token::FixedBytes32(digest.0)])
            }
        }
    }

    /// Parse calldata back into a call.
    pub fn decode(calldata: &[u8]) -> Result<Self, CodecError> {
        if calldata.len() < 4 {
            return Err(CodecError::Abi(format!(
                "calldata of {} bytes has no selector",
                calldata.len()
            )));
        }
        let (sel, args) = calldata.split_at(4);

        if sel == abi::selector(ADD_DOCUMENT) || sel == abi::selector(UPDATE_DOCUMENT) {
            let tokens = abi::decode(
                &[ParamType::FixedBytes32, ParamType::String, ParamType::String],
                args,
            )?;
            let (digest, name, doc_type) = match tokens.as_slice() {
                [Token::FixedBytes32(d), Token::String(n), Token::String(t)] => {
                    (Digest32::new(*d), n.clone(), t.clone())
                }
                _ => return Err(CodecError::Abi("unexpected argument layout".into())),
            };
            return Ok(if sel == abi::selector(ADD_DOCUMENT) {
                Self::Add {
                    digest,
                    name,
                    doc_type,
                }
            } else {
                Self::Update {
                    digest,
                    name,
                    doc_type,
                }
            });
        }

        if sel == abi::selector(DELETE_DOCUMENT) || sel == abi::selector(VERIFY_DOCUMENT) {
            let digest = match abi::decode(&[ParamType::FixedBytes32], args)?.as_slice() {
                [Token::FixedBytes32(d)] => Digest32::new(*d),
                _ => return Err(CodecError::Abi("unexpected argument layout".into())),
            };
            return Ok(if sel == abi::selector(DELETE_DOCUMENT) {
                Self::Delete { digest }
            } else {
                Self::Verify { digest }
            });
        }

        Err(CodecError::UnknownSelector(hex::encode(sel)))
    }
}

fn metadata_tokens(digest: &Digest32, name: &str, doc_type: &str) -> [Token; 3] {
    [
        Token::FixedBytes32(digest.0),
        Token::String(name.to_string()),
        Token::String(doc_type.to_string()),
    ]
}

/// Return tuple of `verifyDocument`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutput {
    pub exists: bool,
    pub issuer: Address,
    pub timestamp: u64,
    pub name: String,
    pub doc_type: String,
}

impl VerifyOutput {
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        match abi::decode(&VERIFY_OUTPUT, data)?.as_slice() {
            [Token::Bool(exists), Token::Address(issuer), Token::Uint(ts), Token::String(name), Token::String(doc_type)] =>
            {
                if ts.bits() > 64 {
                    return Err(CodecError::Abi(format!("timestamp out of range: {}", ts)));
                }
                Ok(Self {
                    exists: *exists,
                    issuer: *issuer,
                    timestamp: ts.low_u64(),
                    name: name.clone(),
                    doc_type: doc_type.clone(),
                })
            }
            _ => Err(CodecError::Abi("unexpected verifyDocument output".into())),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        abi::encode(&[
            Token::Bool(self.exists),
            Token::Address(self.issuer),
            Token::Uint(U256::from(self.timestamp)),
            Token::String(self.name.clone()),
            Token::String(self.doc_type.clone()),
        ])
    }

    /// Attach the key the output was read for.
    pub fn into_record(self, content_hash: Digest32) -> DocumentRecord {
        DocumentRecord {
            content_hash,
            issuer: self.issuer,
            name: self.name,
            doc_type: self.doc_type,
            registered_at: self.timestamp,
            exists: self.exists,
        }
    }
}
