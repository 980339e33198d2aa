//! # Transaction Tracker
//!
//! ```text
//! Built ──sign──→ Signed ──submit──→ Submitted ──┬─→ Confirmed(Success)
//!                                                ├─→ Confirmed(Failed)
//!                                                └─→ TimedOut (left pending)
//! ```
//!
//! ## Nonce Serialization
//!
//! `reserve → build → sign_and_submit` runs under one per-credential lock.
//! `build` takes the slot by `&mut` and `sign_and_submit` consumes it, so a
//! transaction can only be built and sent while the lock is held. The lock
//! is released as soon as the node accepts the transaction; confirmation
//! waits run outside it. That is why nonces are read with the `pending`
//! tag: the next build must see transactions that are sent but not mined.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dl_02_ledger_client::{transaction_hash, LedgerClient, LedgerError, LegacyTransaction, RpcReceipt};
use primitive_types::U256;
use shared_types::{to_prefixed_hex, Address, TransactionReceipt, TxHash};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::domain::{
    receipt_from_rpc, GasPolicy, GasPrice, LedgerSession, TrackerError, TransactionDetails,
    TransactionIntent, TransactionKind, TransactionStatus, UnsignedTransaction,
};
use crate::ports::ReceiptStore;

/// Default wait for a receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default receipt polling interval.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub gas: GasPolicy,
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gas: GasPolicy::default(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }
}

/// Exclusive right to allocate the next nonce and submit.
pub struct SubmissionSlot<'a> {
    _guard: MutexGuard<'a, ()>,
    acquired_at: Instant,
}

impl SubmissionSlot<'_> {
    /// Time since the lock was taken.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// Builds, signs, submits and confirms transactions for one session.
pub struct TransactionTracker {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn ReceiptStore>,
    session: LedgerSession,
    config: TrackerConfig,
    submission_lock: Mutex<()>,
}

impl TransactionTracker {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn ReceiptStore>,
        session: LedgerSession,
        config: TrackerConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            session,
            config,
            submission_lock: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &LedgerSession {
        &self.session
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn ReceiptStore> {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Wait for the submission lock.
    pub async fn reserve(&self) -> SubmissionSlot<'_> {
        let guard = self.submission_lock.lock().await;
        SubmissionSlot {
            _guard: guard,
            acquired_at: Instant::now(),
        }
    }

    /// Build a document transaction. Reads the pending nonce and, when
    /// configured, the node gas price. Nothing is sent.
    pub async fn build(
        &self,
        slot: &mut SubmissionSlot<'_>,
        intent: &TransactionIntent,
    ) -> Result<UnsignedTransaction, TrackerError> {
        let contract = self.session.contract().ok_or(TrackerError::NoContract)?;
        let kind = TransactionKind::Document {
            operation: intent.operation,
            content_hash: intent.content_hash,
        };
        self.build_raw(
            slot,
            kind,
            Some(contract),
            intent.to_call().encode(),
            self.config.gas.document_gas_limit,
        )
        .await
    }

    async fn build_raw(
        &self,
        _slot: &mut SubmissionSlot<'_>,
        kind: TransactionKind,
        to: Option<Address>,
        data: Vec<u8>,
        gas_limit: u64,
    ) -> Result<UnsignedTransaction, TrackerError> {
        let nonce = self.ledger.nonce(&self.session.sender()).await?;
        let gas_price = match self.config.gas.price {
            GasPrice::Fixed(price) => price,
            GasPrice::Node => self.ledger.gas_price().await?,
        };

        debug!(kind = %kind, nonce, gas_limit, gas_price = %gas_price, "[dl-04] Built transaction");

        Ok(UnsignedTransaction {
            kind,
            chain_id: self.session.chain_id(),
            tx: LegacyTransaction {
                nonce,
                gas_price,
                gas_limit,
                to,
                value: U256::zero(),
                data,
            },
        })
    }

    /// Sign with the session credential and broadcast. Releases the slot
    /// once the node has answered.
    pub async fn sign_and_submit(
        &self,
        slot: SubmissionSlot<'_>,
        unsigned: UnsignedTransaction,
    ) -> Result<TxHash, TrackerError> {
        let raw = self
            .session
            .credential()
            .sign(&unsigned.tx, unsigned.chain_id)?;
        let local_hash = transaction_hash(&raw);

        let result = self.ledger.submit(&raw).await;
        let held = slot.held_for();
        drop(slot);

        match result {
            Ok(tx_hash) => {
                if tx_hash != local_hash {
                    warn!(
                        node = %to_prefixed_hex(&tx_hash),
                        local = %to_prefixed_hex(&local_hash),
                        "[dl-04] Node reported a different transaction hash"
                    );
                }
                info!(
                    tx_hash = %to_prefixed_hex(&tx_hash),
                    kind = %unsigned.kind,
                    nonce = unsigned.nonce(),
                    lock_ms = held.as_millis() as u64,
                    "[dl-04] Transaction submitted"
                );
                Ok(tx_hash)
            }
            Err(e) => {
                warn!(kind = %unsigned.kind, nonce = unsigned.nonce(), error = %e, "[dl-04] Submission failed");
                Err(TrackerError::from_submission(e))
            }
        }
    }

    /// Reserve, build, sign and submit one intent.
    pub async fn submit(&self, intent: &TransactionIntent) -> Result<TxHash, TrackerError> {
        let mut slot = self.reserve().await;
        let unsigned = self.build(&mut slot, intent).await?;
        self.sign_and_submit(slot, unsigned).await
    }

    // =========================================================================
    // Confirmation
    // =========================================================================

    /// Wait for the receipt, complete it with the block timestamp and
    /// persist it. On timeout the transaction is left pending.
    pub async fn await_confirmation(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<TransactionReceipt, TrackerError> {
        self.confirm(tx_hash, timeout).await.map(|(_, receipt)| receipt)
    }

    async fn confirm(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<(RpcReceipt, TransactionReceipt), TrackerError> {
        let rpc = match self
            .ledger
            .wait_for_receipt(tx_hash, timeout, self.config.receipt_poll_interval)
            .await
        {
            Ok(rpc) => rpc,
            Err(e @ LedgerError::ConfirmationTimeout { .. }) => {
                warn!(
                    tx_hash = %to_prefixed_hex(tx_hash),
                    waited_ms = timeout.as_millis() as u64,
                    "[dl-04] No receipt yet; transaction left pending"
                );
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let receipt = self.complete(&rpc).await?;
        self.persist(&receipt)?;

        info!(
            tx_hash = %receipt.tx_hash_hex(),
            status = %receipt.status,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "[dl-04] Transaction confirmed"
        );
        Ok((rpc, receipt))
    }

    async fn complete(&self, rpc: &RpcReceipt) -> Result<TransactionReceipt, TrackerError> {
        let block = self
            .ledger
            .block(rpc.block_number, false)
            .await?
            .ok_or_else(|| {
                LedgerError::MalformedResponse(format!(
                    "receipt references missing block {}",
                    rpc.block_number
                ))
            })?;
        Ok(receipt_from_rpc(rpc, block.timestamp))
    }

    /// Submit and wait with the configured timeout.
    pub async fn execute(
        &self,
        intent: &TransactionIntent,
    ) -> Result<TransactionReceipt, TrackerError> {
        let tx_hash = self.submit(intent).await?;
        self.await_confirmation(&tx_hash, self.config.confirmation_timeout)
            .await
    }

    /// Insert-if-absent. Returns `true` when a new row was written.
    pub fn persist(&self, receipt: &TransactionReceipt) -> Result<bool, TrackerError> {
        let inserted = self.store.insert_if_absent(receipt)?;
        if !inserted {
            debug!(tx_hash = %receipt.tx_hash_hex(), "[dl-04] Receipt already stored");
        }
        Ok(inserted)
    }

    // =========================================================================
    // Deployment
    // =========================================================================

    /// Deploy contract bytecode and wait for the contract address.
    pub async fn deploy(&self, bytecode: Vec<u8>) -> Result<Address, TrackerError> {
        let mut slot = self.reserve().await;
        let unsigned = self
            .build_raw(
                &mut slot,
                TransactionKind::Deploy,
                None,
                bytecode,
                self.config.gas.deploy_gas_limit,
            )
            .await?;
        let tx_hash = self.sign_and_submit(slot, unsigned).await?;

        let (rpc, receipt) = self
            .confirm(&tx_hash, self.config.confirmation_timeout)
            .await?;

        match rpc.contract_address {
            Some(address) if receipt.is_success() => {
                info!(contract = %to_prefixed_hex(&address), "[dl-04] Contract deployed");
                Ok(address)
            }
            _ => Err(TrackerError::DeploymentFailed {
                tx_hash: to_prefixed_hex(&tx_hash),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Status from the store first, then from the ledger.
    pub async fn status(&self, tx_hash: &TxHash) -> Result<TransactionStatus, TrackerError> {
        if let Some(receipt) = self.store.get(tx_hash)? {
            return Ok(receipt.status.into());
        }
        if let Some(rpc) = self.ledger.receipt(tx_hash).await? {
            return Ok(receipt_from_rpc(&rpc, 0).status.into());
        }
        if self.ledger.transaction(tx_hash).await?.is_some() {
            return Ok(TransactionStatus::Pending);
        }
        Ok(TransactionStatus::Unknown)
    }

    /// Transaction, receipt and block metadata from the ledger.
    pub async fn details(&self, tx_hash: &TxHash) -> Result<TransactionDetails, TrackerError> {
        let tx = self
            .ledger
            .transaction(tx_hash)
            .await?
            .ok_or_else(|| TrackerError::UnknownTransaction(to_prefixed_hex(tx_hash)))?;

        let mut details = TransactionDetails {
            tx_hash: tx.hash,
            sender: tx.from,
            recipient: tx.to,
            gas_limit: tx.gas,
            nonce: tx.nonce,
            status: TransactionStatus::Pending,
            gas_used: None,
            log_count: 0,
            block_number: None,
            block_timestamp: None,
            block_transaction_count: None,
        };

        if let Some(rpc) = self.ledger.receipt(tx_hash).await? {
            details.status = receipt_from_rpc(&rpc, 0).status.into();
            details.gas_used = Some(rpc.gas_used);
            details.log_count = rpc.logs.len();
            details.block_number = Some(rpc.block_number);
            if let Some(block) = self.ledger.block(rpc.block_number, false).await? {
                details.block_timestamp = Some(block.timestamp);
                details.block_transaction_count = Some(block.transactions.len());
            }
        }

        Ok(details)
    }

    /// Fetch a mined transaction from the ledger and persist its receipt.
    /// Returns the receipt and whether a new row was written.
    pub async fn record(&self, tx_hash: &TxHash) -> Result<(TransactionReceipt, bool), TrackerError> {
        let rpc = match self.ledger.receipt(tx_hash).await? {
            Some(rpc) => rpc,
            None if self.ledger.transaction(tx_hash).await?.is_some() => {
                return Err(TrackerError::NotMined(to_prefixed_hex(tx_hash)));
            }
            None => return Err(TrackerError::UnknownTransaction(to_prefixed_hex(tx_hash))),
        };
        let receipt = self.complete(&rpc).await?;
        let inserted = self.persist(&receipt)?;
        Ok((receipt, inserted))
    }

    /// Latest stored receipts.
    pub fn receipts(&self, limit: usize) -> Result<Vec<TransactionReceipt>, TrackerError> {
        Ok(self.store.recent(limit)?)
    }
}
