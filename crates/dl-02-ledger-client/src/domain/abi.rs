//! # Contract ABI Codec
//!
//! Head/tail encoding for the handful of Solidity types the registry
//! contract uses. Static types occupy one 32-byte head word; `string` puts
//! an offset in the head and `len || bytes || padding` in the tail.

use primitive_types::U256;
use shared_types::Address;

use super::errors::CodecError;
use super::transaction::keccak256;

const WORD: usize = 32;

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    FixedBytes32([u8; 32]),
    String(String),
    Bool(bool),
    Address(Address),
    Uint(U256),
}

/// ABI type used to drive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    FixedBytes32,
    String,
    Bool,
    Address,
    Uint256,
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode `selector(signature) || encode(tokens)`.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(tokens));
    out
}

/// Encode a tuple of tokens.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::String(s) => {
                head.extend(uint_word(U256::from(head_len + tail.len())));
                encode_string(s, &mut tail);
            }
            Token::FixedBytes32(bytes) => head.extend_from_slice(bytes),
            Token::Bool(b) => head.extend(uint_word(U256::from(u8::from(*b)))),
            Token::Address(addr) => {
                head.extend_from_slice(&[0u8; WORD - 20]);
                head.extend_from_slice(addr);
            }
            Token::Uint(value) => head.extend(uint_word(*value)),
        }
    }

    head.extend(tail);
    head
}

fn encode_string(s: &str, tail: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    tail.extend(uint_word(U256::from(bytes.len())));
    tail.extend_from_slice(bytes);
    let pad = (WORD - bytes.len() % WORD) % WORD;
    tail.extend(std::iter::repeat(0u8).take(pad));
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

/// Decode a tuple of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, CodecError> {
    types
        .iter()
        .enumerate()
        .map(|(i, kind)| decode_param(*kind, data, i * WORD))
        .collect()
}

fn decode_param(kind: ParamType, data: &[u8], head_at: usize) -> Result<Token, CodecError> {
    let word = read_word(data, head_at)?;
    match kind {
        ParamType::FixedBytes32 => Ok(Token::FixedBytes32(word)),
        ParamType::Uint256 => Ok(Token::Uint(U256::from_big_endian(&word))),
        ParamType::Bool => match word {
            w if w[..WORD - 1].iter().all(|b| *b == 0) && w[WORD - 1] <= 1 => {
                Ok(Token::Bool(w[WORD - 1] == 1))
            }
            _ => Err(CodecError::Abi(format!("invalid bool at {}", head_at))),
        },
        ParamType::Address => {
            if word[..WORD - 20].iter().any(|b| *b != 0) {
                return Err(CodecError::Abi(format!("dirty address at {}", head_at)));
            }
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word[WORD - 20..]);
            Ok(Token::Address(addr))
        }
        ParamType::String => {
            let offset = word_to_usize(&word)?;
            let len = word_to_usize(&read_word(data, offset)?)?;
            let start = offset + WORD;
            let end = start
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| CodecError::Abi(format!("string of {} bytes overruns", len)))?;
            String::from_utf8(data[start..end].to_vec())
                .map(Token::String)
                .map_err(|e| CodecError::Abi(format!("string is not UTF-8: {}", e)))
        }
    }
}

fn read_word(data: &[u8], at: usize) -> Result<[u8; WORD], CodecError> {
    let end = at
        .checked_add(WORD)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            CodecError::Abi(format!(
                "truncated payload: need word at {}, have {} bytes",
                at,
                data.len()
            ))
        })?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(&data[at..end]);
    Ok(word)
}

fn word_to_usize(word: &[u8; WORD]) -> Result<usize, CodecError> {
    let value = U256::from_big_endian(word);
    if value.bits() > 32 {
        return Err(CodecError::Abi(format!("offset out of range: {}", value)));
    }
    Ok(value.low_u64() as usize)
}

/// Decode an `Error(string)` revert payload. Returns `None` for any other
/// payload, including custom errors and empty reverts.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    match decode(&[ParamType::String], body).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

/// Encode an `Error(string)` revert payload.
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let mut out = ERROR_STRING_SELECTOR.to_vec();
    out.extend(encode(&[Token::String(reason.to_string())]));
    out
}
