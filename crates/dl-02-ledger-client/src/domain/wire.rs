//! # JSON-RPC Shapes
//!
//! Typed views of the node responses the engine reads. Quantities are
//! `0x`-prefixed hex on the wire; addresses and hashes are fixed-width hex.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Address, Hash, TxHash};

use super::errors::CodecError;

/// Block selector for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Pending,
    Number(u64),
}

impl BlockTag {
    /// JSON-RPC parameter form.
    pub fn to_param(&self) -> String {
        match self {
            Self::Latest => "latest".to_string(),
            Self::Pending => "pending".to_string(),
            Self::Number(n) => format!("0x{:x}", n),
        }
    }
}

/// A read-only contract call (`eth_call`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
    pub block: BlockTag,
}

impl CallRequest {
    /// Call against the latest block.
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self {
            from: None,
            to,
            data,
            block: BlockTag::Latest,
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn at(mut self, block: BlockTag) -> Self {
        self.block = block;
        self
    }
}

/// `eth_getTransactionReceipt` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    #[serde(with = "hex_fixed")]
    pub transaction_hash: TxHash,
    #[serde(with = "hex_fixed")]
    pub from: Address,
    #[serde(default, with = "opt_hex_fixed")]
    pub to: Option<Address>,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    /// Absent on pre-Byzantium chains.
    #[serde(default, with = "opt_quantity")]
    pub status: Option<u64>,
    #[serde(with = "quantity")]
    pub block_number: u64,
    #[serde(with = "hex_fixed")]
    pub block_hash: Hash,
    #[serde(default, with = "opt_hex_fixed")]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub logs: Vec<Value>,
}

impl RpcReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}

/// `eth_getTransactionByHash` result, also the element of a full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    #[serde(with = "hex_fixed")]
    pub hash: TxHash,
    #[serde(with = "hex_fixed")]
    pub from: Address,
    #[serde(default, with = "opt_hex_fixed")]
    pub to: Option<Address>,
    #[serde(with = "quantity")]
    pub nonce: u64,
    #[serde(with = "quantity")]
    pub gas: u64,
    pub gas_price: U256,
    pub value: U256,
    #[serde(with = "hex_bytes")]
    pub input: Vec<u8>,
    /// `None` while pending.
    #[serde(default, with = "opt_quantity")]
    pub block_number: Option<u64>,
}

/// Transactions of a block, as hashes or full objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Full(Vec<RpcTransaction>),
    Hashes(#[serde(with = "hex_fixed_vec")] Vec<TxHash>),
}

impl BlockTransactions {
    pub fn len(&self) -> usize {
        match self {
            Self::Full(txs) => txs.len(),
            Self::Hashes(hashes) => hashes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transaction hashes in block order.
    pub fn hashes(&self) -> Vec<TxHash> {
        match self {
            Self::Full(txs) => txs.iter().map(|tx| tx.hash).collect(),
            Self::Hashes(hashes) => hashes.clone(),
        }
    }
}

/// `eth_getBlockByNumber` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    #[serde(with = "quantity")]
    pub number: u64,
    #[serde(with = "hex_fixed")]
    pub hash: Hash,
    #[serde(with = "quantity")]
    pub timestamp: u64,
    pub transactions: BlockTransactions,
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u64, CodecError> {
    let body = s
        .strip_prefix("0x")
        .ok_or_else(|| CodecError::Abi(format!("quantity without 0x prefix: {}", s)))?;
    if body.is_empty() {
        return Err(CodecError::Abi("empty quantity".into()));
    }
    u64::from_str_radix(body, 16).map_err(|e| CodecError::Abi(format!("bad quantity {}: {}", s, e)))
}

pub(crate) mod quantity {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{:x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_quantity(&s).map_err(D::Error::custom)
    }
}

pub(crate) mod opt_quantity {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_str(&format!("0x{:x}", v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| super::parse_quantity(&s).map_err(D::Error::custom))
            .transpose()
    }
}

pub(crate) mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use shared_types::{decode_hex, to_prefixed_hex};

    pub fn serialize<S: Serializer>(value: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_prefixed_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        decode_hex(&s).map_err(D::Error::custom)
    }
}

pub(crate) mod hex_fixed {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use shared_types::{decode_hex, to_prefixed_hex};

    pub fn serialize<S: Serializer, const N: usize>(value: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_prefixed_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(d)?;
        parse::<N>(&s).map_err(D::Error::custom)
    }

    pub fn parse<const N: usize>(s: &str) -> Result<[u8; N], String> {
        let bytes = decode_hex(s).map_err(|e| e.to_string())?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("expected {} bytes, got {}", N, bytes.len()))
    }
}

pub(crate) mod opt_hex_fixed {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use shared_types::to_prefixed_hex;

    pub fn serialize<S: Serializer, const N: usize>(
        value: &Option<[u8; N]>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_str(&to_prefixed_hex(v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<Option<[u8; N]>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| super::hex_fixed::parse::<N>(&s).map_err(D::Error::custom))
            .transpose()
    }
}

pub(crate) mod hex_fixed_vec {
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};
    use shared_types::to_prefixed_hex;

    pub fn serialize<S: Serializer>(value: &[[u8; 32]], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(value.len()))?;
        for item in value {
            seq.serialize_element(&to_prefixed_hex(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<[u8; 32]>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|s| super::hex_fixed::parse::<32>(s).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TX_HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
    const FROM: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const TO: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

    #[test]
    fn test_block_tag_params() {
        assert_eq!(BlockTag::Latest.to_param(), "latest");
        assert_eq!(BlockTag::Pending.to_param(), "pending");
        assert_eq!(BlockTag::Number(255).to_param(), "0xff");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x7a69").unwrap(), 31337);
        assert!(parse_quantity("7a69").is_err());
        assert!(parse_quantity("0x").is_err());
    }

    #[test]
    fn test_receipt_from_node_json() {
        let value = json!({
            "transactionHash": TX_HASH,
            "from": FROM,
            "to": TO,
            "gasUsed": "0x1d4c0",
            "status": "0x1",
            "blockNumber": "0x2",
            "blockHash": TX_HASH,
            "contractAddress": null,
            "logs": [{}],
            "cumulativeGasUsed": "0x1d4c0"
        });
        let receipt: RpcReceipt = serde_json::from_value(value).unwrap();
        assert_eq!(receipt.gas_used, 120_000);
        assert_eq!(receipt.block_number, 2);
        assert!(receipt.succeeded());
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.logs.len(), 1);
    }

    #[test]
    fn test_pending_transaction_json() {
        let value = json!({
            "hash": TX_HASH,
            "from": FROM,
            "to": null,
            "nonce": "0x0",
            "gas": "0x3d0900",
            "gasPrice": "0xba43b7400",
            "value": "0x0",
            "input": "0x6080",
            "blockNumber": null
        });
        let tx: RpcTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(tx.to, None);
        assert_eq!(tx.gas, 4_000_000);
        assert_eq!(tx.gas_price, U256::from(50_000_000_000u64));
        assert_eq!(tx.input, vec![0x60, 0x80]);
        assert_eq!(tx.block_number, None);
    }

    #[test]
    fn test_block_with_hashes_or_full() {
        let hashes = json!({
            "number": "0x3",
            "hash": TX_HASH,
            "timestamp": "0x6553f100",
            "transactions": [TX_HASH]
        });
        let block: RpcBlock = serde_json::from_value(hashes).unwrap();
        assert_eq!(block.timestamp, 1_700_000_000);
        assert!(matches!(block.transactions, BlockTransactions::Hashes(_)));
        assert_eq!(block.transactions.len(), 1);

        let empty = json!({
            "number": "0x0",
            "hash": TX_HASH,
            "timestamp": "0x0",
            "transactions": []
        });
        let block: RpcBlock = serde_json::from_value(empty).unwrap();
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn test_block_serializes_to_node_shape() {
        let block = RpcBlock {
            number: 16,
            hash: [0xAA; 32],
            timestamp: 1_700_000_016,
            transactions: BlockTransactions::Hashes(vec![[0x01; 32]]),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["number"], "0x10");
        assert_eq!(value["transactions"][0], format!("0x{}", "01".repeat(32)));
        let back: RpcBlock = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
    }
}
