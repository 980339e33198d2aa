//! # Document Registry
//!
//! ```text
//! content ──hash──→ Digest32 ──intent──→ TransactionTracker ──→ receipt
//!                       │                                         │
//!                       └──verify (read-only call)          failed? replay at
//!                                                            receipt block
//! ```
//!
//! ## Rejections
//!
//! A contract rejection reaches us in one of two ways. Nodes that simulate
//! before accepting return the revert at submission. Nodes that accept
//! anything mine a failed receipt, and the reason is recovered by replaying
//! the same call read-only against the state of the receipt's block. Both
//! paths are classified through the same [`RevertTable`].

use std::sync::Arc;

use dl_01_canonicalizer::{encode_key, hash};
use dl_02_ledger_client::{
    BlockTag, CallRequest, ContractRejection, LedgerClient, LedgerError, RegistryCall, RevertTable,
    VerifyOutput,
};
use dl_04_transaction_tracker::{TrackerError, TransactionIntent, TransactionTracker};
use shared_types::{to_prefixed_hex, Address, Digest32, TransactionReceipt};
use tracing::{debug, info, warn};

use crate::domain::{RegistryError, Verification};

/// Add, verify, update and delete documents through one session.
pub struct DocumentRegistry {
    tracker: Arc<TransactionTracker>,
    contract: Address,
    revert_table: RevertTable,
}

impl DocumentRegistry {
    /// Fails with `NoContract` when the session has no contract address.
    pub fn new(tracker: Arc<TransactionTracker>) -> Result<Self, RegistryError> {
        let contract = tracker
            .session()
            .contract()
            .ok_or(RegistryError::NoContract)?;
        Ok(Self {
            tracker,
            contract,
            revert_table: RevertTable::default(),
        })
    }

    pub fn with_revert_table(mut self, revert_table: RevertTable) -> Self {
        self.revert_table = revert_table;
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn tracker(&self) -> &Arc<TransactionTracker> {
        &self.tracker
    }

    fn ledger(&self) -> &Arc<dyn LedgerClient> {
        self.tracker.ledger()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Register `content` under its digest.
    pub async fn add_document(
        &self,
        content: &[u8],
        name: &str,
        doc_type: &str,
    ) -> Result<TransactionReceipt, RegistryError> {
        self.add_digest(hash(content), name, doc_type).await
    }

    pub async fn add_digest(
        &self,
        digest: Digest32,
        name: &str,
        doc_type: &str,
    ) -> Result<TransactionReceipt, RegistryError> {
        self.run(TransactionIntent::add(digest, name, doc_type)).await
    }

    /// Replace the name and type of a live record. The digest never changes.
    pub async fn update_document(
        &self,
        content: &[u8],
        new_name: &str,
        new_type: &str,
    ) -> Result<TransactionReceipt, RegistryError> {
        self.update_digest(hash(content), new_name, new_type).await
    }

    pub async fn update_digest(
        &self,
        digest: Digest32,
        new_name: &str,
        new_type: &str,
    ) -> Result<TransactionReceipt, RegistryError> {
        self.run(TransactionIntent::update(digest, new_name, new_type))
            .await
    }

    /// Tombstone a live record. The key cannot be registered again.
    pub async fn delete_document(&self, content: &[u8]) -> Result<TransactionReceipt, RegistryError> {
        self.delete_digest(hash(content)).await
    }

    pub async fn delete_digest(&self, digest: Digest32) -> Result<TransactionReceipt, RegistryError> {
        self.run(TransactionIntent::delete(digest)).await
    }

    async fn run(&self, intent: TransactionIntent) -> Result<TransactionReceipt, RegistryError> {
        let digest = intent.content_hash;
        debug!(operation = %intent.operation, digest = %digest, "[dl-03] Submitting document operation");

        match self.tracker.execute(&intent).await {
            Ok(receipt) if receipt.is_success() => {
                info!(
                    operation = %intent.operation,
                    digest = %digest,
                    tx_hash = %receipt.tx_hash_hex(),
                    block = receipt.block_number,
                    "[dl-03] Document operation confirmed"
                );
                Ok(receipt)
            }
            Ok(receipt) => Err(self.explain_failure(&intent, &receipt).await),
            Err(TrackerError::Reverted { reason }) => {
                Err(self.rejection(&digest, None, reason))
            }
            Err(TrackerError::NoContract) => Err(RegistryError::NoContract),
            Err(e) => Err(e.into()),
        }
    }

    /// Replay a mined-but-failed call to recover its revert reason.
    ///
    /// The receipt's block is tried first, then its parent. A later
    /// transaction in the same block can make the call succeed against the
    /// post-block state.
    async fn explain_failure(
        &self,
        intent: &TransactionIntent,
        receipt: &TransactionReceipt,
    ) -> RegistryError {
        let data = intent.to_call().encode();
        let blocks = [Some(receipt.block_number), receipt.block_number.checked_sub(1)];

        let mut reason = None;
        for block in blocks.into_iter().flatten() {
            let request = CallRequest::new(self.contract, data.clone())
                .from(receipt.sender)
                .at(BlockTag::Number(block));

            match self.ledger().call(&request).await {
                Err(LedgerError::Reverted { reason: replayed }) => {
                    reason = replayed;
                    break;
                }
                Ok(_) => {
                    debug!(
                        tx_hash = %receipt.tx_hash_hex(),
                        block,
                        "[dl-03] Failed transaction succeeds on replay"
                    );
                }
                Err(e) => {
                    warn!(
                        tx_hash = %receipt.tx_hash_hex(),
                        block,
                        error = %e,
                        "[dl-03] Could not replay failed transaction"
                    );
                    break;
                }
            }
        }

        if reason.is_none() {
            warn!(tx_hash = %receipt.tx_hash_hex(), "[dl-03] No revert reason for failed transaction");
        }

        self.rejection(&intent.content_hash, Some(receipt.tx_hash_hex()), reason)
    }

    fn rejection(
        &self,
        digest: &Digest32,
        tx_hash: Option<String>,
        reason: Option<String>,
    ) -> RegistryError {
        let digest_hex = digest.to_prefixed_hex();
        match self.revert_table.classify(reason.as_deref()) {
            Some(ContractRejection::AlreadyExists) => {
                info!(digest = %digest, "[dl-03] Document already registered");
                RegistryError::AlreadyExists { digest: digest_hex }
            }
            Some(ContractRejection::NotFound) => {
                info!(digest = %digest, "[dl-03] Document not registered");
                RegistryError::NotFound { digest: digest_hex }
            }
            None => {
                warn!(
                    digest = %digest,
                    tx_hash = tx_hash.as_deref().unwrap_or("-"),
                    reason = reason.as_deref().unwrap_or("-"),
                    "[dl-03] Unmapped contract rejection"
                );
                RegistryError::TransactionFailed { tx_hash, reason }
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Re-derive the digest of `content` and read its record.
    pub async fn verify_document(&self, content: &[u8]) -> Result<Verification, RegistryError> {
        self.verify_digest(hash(content)).await
    }

    /// Verify by hex key. A malformed key fails before any ledger call.
    pub async fn verify_by_key(&self, hex_key: &str) -> Result<Verification, RegistryError> {
        let digest = encode_key(hex_key)?;
        self.verify_digest(digest).await
    }

    pub async fn verify_digest(&self, digest: Digest32) -> Result<Verification, RegistryError> {
        let request = CallRequest::new(self.contract, RegistryCall::Verify { digest }.encode())
            .from(self.tracker.session().sender());

        let output = match self.ledger().call(&request).await {
            Ok(output) => output,
            Err(LedgerError::Reverted { reason }) => {
                debug!(
                    digest = %digest,
                    reason = reason.as_deref().unwrap_or("-"),
                    "[dl-03] Verification rejected by contract"
                );
                return Ok(Verification::unregistered(digest));
            }
            Err(e) => return Err(e.into()),
        };

        if output.is_empty() {
            warn!(contract = %to_prefixed_hex(&self.contract), "[dl-03] No contract code at address");
            return Err(RegistryError::NoContract);
        }

        let decoded = VerifyOutput::decode(&output).map_err(LedgerError::from)?;
        // Contracts that return a zeroed tuple for unknown keys
        if !decoded.exists && decoded.timestamp == 0 {
            return Ok(Verification::unregistered(digest));
        }

        let verification = Verification::from_record(decoded.into_record(digest));
        debug!(digest = %digest, matched = verification.matched, "[dl-03] Document verified");
        Ok(verification)
    }
}
