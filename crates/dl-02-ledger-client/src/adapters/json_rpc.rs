//! # JSON-RPC Ledger Client
//!
//! Ethereum JSON-RPC 2.0 over HTTP. One request per port method, no
//! batching and no retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use primitive_types::U256;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::{to_prefixed_hex, Address, TxHash};
use tracing::{debug, trace};

use crate::domain::wire::parse_quantity;
use crate::domain::{
    revert_reason_from_rpc, CallRequest, LedgerError, RpcBlock, RpcReceipt, RpcTransaction,
};
use crate::ports::LedgerClient;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl JsonRpcError {
    fn into_ledger_error(self) -> LedgerError {
        match revert_reason_from_rpc(&self.message, self.data.as_ref()) {
            Some(reason) => LedgerError::Reverted { reason },
            None => LedgerError::Rpc {
                code: self.code,
                message: self.message,
            },
        }
    }
}

/// Ledger client speaking JSON-RPC to a node.
pub struct JsonRpcLedgerClient {
    http_client: Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl JsonRpcLedgerClient {
    /// Create a client with the default request timeout.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, LedgerError> {
        Self::with_timeout(rpc_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(
        rpc_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Connectivity(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call_raw(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        trace!(method, id, "[dl-02] JSON-RPC request");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        if let Some(error) = rpc_response.error {
            debug!(method, code = error.code, message = %error.message, "[dl-02] JSON-RPC error");
            return Err(error.into_ledger_error());
        }

        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    async fn rpc<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, LedgerError> {
        let value = self.call_raw(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| LedgerError::MalformedResponse(format!("{}: {}", method, e)))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<u64, LedgerError> {
        let result: String = self.rpc(method, params).await?;
        parse_quantity(&result).map_err(|e| LedgerError::MalformedResponse(e.to_string()))
    }

    fn transport_error(&self, method: &str, e: reqwest::Error) -> LedgerError {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            LedgerError::Connectivity(format!("{} to {}: {}", method, self.rpc_url, e))
        } else {
            LedgerError::MalformedResponse(format!("{}: {}", method, e))
        }
    }
}

fn call_params(request: &CallRequest) -> Value {
    let mut tx = json!({
        "to": to_prefixed_hex(&request.to),
        "data": to_prefixed_hex(&request.data),
    });
    if let Some(from) = &request.from {
        tx["from"] = json!(to_prefixed_hex(from));
    }
    json!([tx, request.block.to_param()])
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.call_quantity("eth_chainId", json!([])).await
    }

    async fn nonce(&self, address: &Address) -> Result<u64, LedgerError> {
        self.call_quantity(
            "eth_getTransactionCount",
            json!([to_prefixed_hex(address), "pending"]),
        )
        .await
    }

    async fn gas_price(&self) -> Result<U256, LedgerError> {
        self.rpc("eth_gasPrice", json!([])).await
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        let result: String = self.rpc("eth_call", call_params(request)).await?;
        shared_types::decode_hex(&result).map_err(|e| LedgerError::MalformedResponse(e.to_string()))
    }

    async fn submit(&self, raw: &[u8]) -> Result<TxHash, LedgerError> {
        let result: String = self
            .rpc("eth_sendRawTransaction", json!([to_prefixed_hex(raw)]))
            .await?;
        shared_types::parse_hash(&result).map_err(|e| LedgerError::MalformedResponse(e.to_string()))
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<RpcReceipt>, LedgerError> {
        self.rpc("eth_getTransactionReceipt", json!([to_prefixed_hex(tx_hash)]))
            .await
    }

    async fn transaction(&self, tx_hash: &TxHash) -> Result<Option<RpcTransaction>, LedgerError> {
        self.rpc("eth_getTransactionByHash", json!([to_prefixed_hex(tx_hash)]))
            .await
    }

    async fn block(&self, number: u64, full: bool) -> Result<Option<RpcBlock>, LedgerError> {
        self.rpc(
            "eth_getBlockByNumber",
            json!([format!("0x{:x}", number), full]),
        )
        .await
    }

    async fn latest_block_number(&self) -> Result<u64, LedgerError> {
        self.call_quantity("eth_blockNumber", json!([])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::encode_revert_reason;
    use crate::domain::BlockTag;

    // =========================================================================
    // Error mapping
    // =========================================================================

    fn rpc_error(code: i64, message: &str, data: Option<Value>) -> JsonRpcError {
        JsonRpcError {
            code,
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn test_plain_error_stays_rpc() {
        let err = rpc_error(-32000, "nonce too low", None).into_ledger_error();
        assert_eq!(
            err,
            LedgerError::Rpc {
                code: -32000,
                message: "nonce too low".into()
            }
        );
    }

    #[test]
    fn test_revert_error_carries_reason() {
        let data = json!(to_prefixed_hex(&encode_revert_reason("Document already exists")));
        let err = rpc_error(3, "execution reverted", Some(data)).into_ledger_error();
        assert_eq!(err.revert_reason(), Some("Document already exists"));
    }

    #[test]
    fn test_response_with_null_result() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.error.is_none());
        let receipt: Option<RpcReceipt> =
            serde_json::from_value(response.result.unwrap_or(Value::Null)).unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn test_call_params_shape() {
        let request = CallRequest::new([0x5F; 20], vec![0x01, 0x02])
            .from([0xF3; 20])
            .at(BlockTag::Number(9));
        let params = call_params(&request);
        assert_eq!(params[0]["to"], to_prefixed_hex(&[0x5F; 20]));
        assert_eq!(params[0]["from"], to_prefixed_hex(&[0xF3; 20]));
        assert_eq!(params[0]["data"], "0x0102");
        assert_eq!(params[1], "0x9");
    }

    // =========================================================================
    // Transport
    // =========================================================================

    #[tokio::test]
    async fn test_unreachable_node_is_connectivity_error() {
        let client = JsonRpcLedgerClient::with_timeout("http://127.0.0.1:1", Duration::from_secs(2))
            .unwrap();
        let err = client.chain_id().await.unwrap_err();
        assert!(err.is_connectivity(), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_request_ids_increase() {
        let client = JsonRpcLedgerClient::new("http://127.0.0.1:8545").unwrap();
        let a = client.next_id();
        let b = client.next_id();
        assert!(b > a);
        assert_eq!(client.rpc_url(), "http://127.0.0.1:8545");
    }
}
