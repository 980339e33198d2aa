//! # Revert Handling
//!
//! Nodes report reverts differently. Geth puts the ABI payload in the error
//! `data` and says `execution reverted: <reason>`; Hardhat says `reverted with
//! reason string '<reason>'`; Ganache says `revert <reason>` and nests the
//! reason inside `data`. [`revert_reason_from_rpc`] normalizes all of them.
//!
//! [`RevertTable`] then maps exact reason strings to the rejections the
//! registry protocol understands.

use std::collections::HashMap;

use serde_json::Value;
use shared_types::decode_hex;

use super::abi::decode_revert_reason;
use super::contract::{REASON_ALREADY_EXISTS, REASON_DOES_NOT_EXIST};

/// Contract-level rejections the registry protocol distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRejection {
    AlreadyExists,
    NotFound,
}

/// Exact-match table from revert reason to rejection.
#[derive(Debug, Clone)]
pub struct RevertTable {
    entries: HashMap<String, ContractRejection>,
}

impl Default for RevertTable {
    fn default() -> Self {
        Self::empty()
            .with_entry(REASON_ALREADY_EXISTS, ContractRejection::AlreadyExists)
            .with_entry(REASON_DOES_NOT_EXIST, ContractRejection::NotFound)
    }
}

impl RevertTable {
    /// A table that maps nothing.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace a mapping.
    pub fn with_entry(mut self, reason: impl Into<String>, rejection: ContractRejection) -> Self {
        self.entries.insert(reason.into(), rejection);
        self
    }

    /// Classify a revert reason. Unknown and absent reasons are `None`.
    pub fn classify(&self, reason: Option<&str>) -> Option<ContractRejection> {
        reason.and_then(|r| self.entries.get(r.trim()).copied())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const GETH_PREFIX: &str = "execution reverted";
const HARDHAT_MARKER: &str = "reverted with reason string '";
const GANACHE_MARKER: &str = "VM Exception while processing transaction: revert";

/// Inspect a JSON-RPC error object for a revert.
///
/// Returns `None` when the error is not a revert, `Some(None)` for a revert
/// without a recoverable reason, and `Some(Some(reason))` otherwise.
pub fn revert_reason_from_rpc(message: &str, data: Option<&Value>) -> Option<Option<String>> {
    let from_data = data.and_then(reason_from_data);
    if from_data.is_some() {
        return Some(from_data);
    }

    if let Some(start) = message.find(HARDHAT_MARKER) {
        let rest = &message[start + HARDHAT_MARKER.len()..];
        let reason = rest.rfind('\'').map(|end| rest[..end].to_string());
        return Some(reason);
    }

    if let Some(rest) = after_word(message, GANACHE_MARKER) {
        let reason = rest.trim();
        return Some((!reason.is_empty()).then(|| reason.to_string()));
    }

    if let Some(rest) = after_word(message, GETH_PREFIX) {
        let reason = rest.trim_start_matches(':').trim();
        return Some((!reason.is_empty()).then(|| reason.to_string()));
    }

    if message.contains("revert") {
        return Some(None);
    }

    None
}

/// The text after `marker`, when `marker` ends on a word boundary.
fn after_word<'a>(message: &'a str, marker: &str) -> Option<&'a str> {
    message.match_indices(marker).find_map(|(start, _)| {
        let rest = &message[start + marker.len()..];
        match rest.chars().next() {
            Some(c) if c.is_alphanumeric() => None,
            _ => Some(rest),
        }
    })
}

fn reason_from_data(data: &Value) -> Option<String> {
    match data {
        Value::String(s) => decode_hex(s).ok().and_then(|b| decode_revert_reason(&b)),
        Value::Object(map) => {
            if let Some(reason) = map.get("reason").and_then(Value::as_str) {
                return Some(reason.to_string());
            }
            if let Some(inner) = map.get("data") {
                return reason_from_data(inner);
            }
            // Ganache keys the revert by transaction hash
            map.values().find_map(reason_from_data)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::encode_revert_reason;
    use serde_json::json;

    // =========================================================================
    // RevertTable
    // =========================================================================

    #[test]
    fn test_default_table() {
        let table = RevertTable::default();
        assert_eq!(
            table.classify(Some("Document already exists")),
            Some(ContractRejection::AlreadyExists)
        );
        assert_eq!(
            table.classify(Some("Document does not exist")),
            Some(ContractRejection::NotFound)
        );
        assert_eq!(table.classify(Some("Ownable: caller is not the owner")), None);
        assert_eq!(table.classify(None), None);
    }

    #[test]
    fn test_table_is_exact_match() {
        let table = RevertTable::default();
        assert_eq!(table.classify(Some("document already exists")), None);
    }

    #[test]
    fn test_table_extension() {
        let table = RevertTable::empty().with_entry("Doc exists", ContractRejection::AlreadyExists);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.classify(Some("Doc exists")),
            Some(ContractRejection::AlreadyExists)
        );
    }

    // =========================================================================
    // Reason extraction
    // =========================================================================

    #[test]
    fn test_geth_payload_in_data() {
        let data = json!(format!(
            "0x{}",
            hex::encode(encode_revert_reason("Document already exists"))
        ));
        let reason = revert_reason_from_rpc("execution reverted", Some(&data));
        assert_eq!(reason, Some(Some("Document already exists".to_string())));
    }

    #[test]
    fn test_geth_message_only() {
        let reason = revert_reason_from_rpc("execution reverted: Document does not exist", None);
        assert_eq!(reason, Some(Some("Document does not exist".to_string())));
        assert_eq!(revert_reason_from_rpc("execution reverted", None), Some(None));
    }

    #[test]
    fn test_hardhat_message() {
        let msg = "Error: VM Exception while processing transaction: reverted with reason string 'Document already exists'";
        assert_eq!(
            revert_reason_from_rpc(msg, None),
            Some(Some("Document already exists".to_string()))
        );
    }

    #[test]
    fn test_hardhat_reverts_without_reason_string() {
        let bare = "VM Exception while processing transaction: reverted without a reason string";
        assert_eq!(revert_reason_from_rpc(bare, None), Some(None));

        let custom = "VM Exception while processing transaction: reverted with custom error 'Exists()'";
        assert_eq!(revert_reason_from_rpc(custom, None), Some(None));
    }

    #[test]
    fn test_ganache_message_only() {
        let msg = "VM Exception while processing transaction: revert Document already exists";
        assert_eq!(
            revert_reason_from_rpc(msg, None),
            Some(Some("Document already exists".to_string()))
        );
        assert_eq!(
            revert_reason_from_rpc("VM Exception while processing transaction: revert", None),
            Some(None)
        );
    }

    #[test]
    fn test_ganache_nested_data() {
        let data = json!({
            "0xabc": { "error": "revert", "reason": "Document does not exist" }
        });
        let msg = "VM Exception while processing transaction: revert Document does not exist";
        assert_eq!(
            revert_reason_from_rpc(msg, Some(&data)),
            Some(Some("Document does not exist".to_string()))
        );
    }

    #[test]
    fn test_non_revert_errors() {
        assert_eq!(revert_reason_from_rpc("nonce too low", None), None);
        assert_eq!(
            revert_reason_from_rpc("insufficient funds for gas * price + value", None),
            None
        );
    }
}
