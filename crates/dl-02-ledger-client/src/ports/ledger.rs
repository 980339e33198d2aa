//! Outbound port to the ledger node.

use std::time::Duration;

use async_trait::async_trait;
use primitive_types::U256;
use shared_types::{to_prefixed_hex, Address, TxHash};
use tracing::debug;

use crate::domain::{CallRequest, LedgerError, RpcBlock, RpcReceipt, RpcTransaction};

/// Port: read and write access to the ledger.
///
/// Implementations hold no engine state and never retry. Every failure is
/// returned to the caller as a [`LedgerError`].
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Chain id used for EIP-155 signatures.
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    /// Next nonce for `address`, counting pending transactions.
    async fn nonce(&self, address: &Address) -> Result<u64, LedgerError>;

    /// Node gas price in wei.
    async fn gas_price(&self) -> Result<U256, LedgerError>;

    /// Execute a read-only call. No transaction is created.
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError>;

    /// Broadcast a raw signed transaction.
    async fn submit(&self, raw: &[u8]) -> Result<TxHash, LedgerError>;

    /// Receipt of a mined transaction; `None` while pending or unknown.
    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<RpcReceipt>, LedgerError>;

    async fn transaction(&self, tx_hash: &TxHash) -> Result<Option<RpcTransaction>, LedgerError>;

    /// Block by number. `full` selects full transaction objects.
    async fn block(&self, number: u64, full: bool) -> Result<Option<RpcBlock>, LedgerError>;

    async fn latest_block_number(&self) -> Result<u64, LedgerError>;

    /// Poll for a receipt until it appears or `timeout` passes.
    ///
    /// Errors from the underlying `receipt` call end the wait immediately.
    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<RpcReceipt, LedgerError> {
        let poll = async {
            loop {
                match self.receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {}
                    Err(e) => return Err(e),
                }
                debug!(tx_hash = %to_prefixed_hex(tx_hash), "[dl-02] Receipt not yet available");
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::ConfirmationTimeout {
                tx_hash: to_prefixed_hex(tx_hash),
                waited: timeout,
            }),
        }
    }
}
