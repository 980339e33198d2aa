//! # In-Memory Ledger
//!
//! A single-node ledger that accepts raw signed legacy transactions and runs
//! the document registry contract natively. Downstream crates drive their
//! integration tests against it through the [`LedgerClient`] port.
//!
//! ## Behaviour
//!
//! - Sender recovered from the signature; chain id must match.
//! - Nonces must be exact: the sender's mined count plus its pooled count.
//! - Blocks are mined on every submission (automine) or on [`SimulatedLedger::mine`].
//! - Block `n` has timestamp `GENESIS_TIMESTAMP + n`.
//! - A record is never removed. Deleting sets `exists = false` and a later
//!   `addDocument` for the same key reverts with `Document already exists`.
//! - Every port call yields to the scheduler first, so concurrent callers
//!   interleave the way they would against a remote node.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use serde_json::{json, Value};
use shared_types::{to_prefixed_hex, Address, Digest32, DocumentRecord, Hash, TxHash};
use tracing::debug;

use crate::domain::contract::{REASON_ALREADY_EXISTS, REASON_DOES_NOT_EXIST};
use crate::domain::{
    contract_address, keccak256, recover_sender, transaction_hash, BlockTag, BlockTransactions,
    CallRequest, LedgerError, LegacyTransaction, RegistryCall, RpcBlock, RpcReceipt,
    RpcTransaction, VerifyOutput,
};
use crate::ports::LedgerClient;

/// Timestamp of block 0.
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
/// Chain id of local development nodes.
pub const DEFAULT_CHAIN_ID: u64 = 31337;
/// Gas price reported by `eth_gasPrice` (1 gwei).
pub const SIMULATED_GAS_PRICE: u64 = 1_000_000_000;

const GAS_TRANSFER: u64 = 21_000;
const GAS_DEPLOY: u64 = 500_000;
const GAS_WRITE: u64 = 90_000;
const GAS_DELETE: u64 = 30_000;
const GAS_REVERTED: u64 = 24_000;

type Registry = BTreeMap<Digest32, VerifyOutput>;
type Contracts = HashMap<Address, Registry>;

struct SimBlock {
    number: u64,
    hash: Hash,
    timestamp: u64,
    transactions: Vec<TxHash>,
}

struct PooledTx {
    hash: TxHash,
    sender: Address,
    tx: LegacyTransaction,
}

struct Outcome {
    success: bool,
    gas_used: u64,
    contract_address: Option<Address>,
    logs: Vec<Value>,
}

struct SimState {
    automine: bool,
    revert_on_submit: bool,
    injected_failures: u32,
    mined_nonces: HashMap<Address, u64>,
    pool: Vec<PooledTx>,
    blocks: Vec<SimBlock>,
    /// Contract state after each block, indexed by block number.
    snapshots: Vec<Contracts>,
    contracts: Contracts,
    transactions: HashMap<TxHash, RpcTransaction>,
    receipts: HashMap<TxHash, RpcReceipt>,
}

impl SimState {
    fn new() -> Self {
        let genesis = SimBlock {
            number: 0,
            hash: block_hash(0, &[0u8; 32]),
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
        };
        Self {
            automine: true,
            revert_on_submit: false,
            injected_failures: 0,
            mined_nonces: HashMap::new(),
            pool: Vec::new(),
            blocks: vec![genesis],
            snapshots: vec![Contracts::new()],
            contracts: Contracts::new(),
            transactions: HashMap::new(),
            receipts: HashMap::new(),
        }
    }

    fn head(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    fn pending_nonce(&self, address: &Address) -> u64 {
        let mined = self.mined_nonces.get(address).copied().unwrap_or(0);
        let pooled = self.pool.iter().filter(|p| p.sender == *address).count() as u64;
        mined + pooled
    }

    fn mine_block(&mut self) -> u64 {
        let number = self.blocks.len() as u64;
        let parent = self.blocks.last().map(|b| b.hash).unwrap_or([0u8; 32]);
        let timestamp = GENESIS_TIMESTAMP + number;
        let hash = block_hash(number, &parent);

        let pool = std::mem::take(&mut self.pool);
        let mut included = Vec::with_capacity(pool.len());

        for pooled in pool {
            let outcome = execute(&mut self.contracts, &pooled, timestamp);
            *self.mined_nonces.entry(pooled.sender).or_insert(0) += 1;

            if let Some(tx) = self.transactions.get_mut(&pooled.hash) {
                tx.block_number = Some(number);
            }
            self.receipts.insert(
                pooled.hash,
                RpcReceipt {
                    transaction_hash: pooled.hash,
                    from: pooled.sender,
                    to: pooled.tx.to,
                    gas_used: outcome.gas_used.min(pooled.tx.gas_limit),
                    status: Some(u64::from(outcome.success)),
                    block_number: number,
                    block_hash: hash,
                    contract_address: outcome.contract_address,
                    logs: outcome.logs,
                },
            );
            included.push(pooled.hash);
        }

        debug!(block = number, txs = included.len(), "[sim] Mined block");
        self.blocks.push(SimBlock {
            number,
            hash,
            timestamp,
            transactions: included,
        });
        self.snapshots.push(self.contracts.clone());
        number
    }
}

fn block_hash(number: u64, parent: &Hash) -> Hash {
    let mut preimage = parent.to_vec();
    preimage.extend_from_slice(&number.to_be_bytes());
    keccak256(&preimage)
}

fn execute(contracts: &mut Contracts, pooled: &PooledTx, timestamp: u64) -> Outcome {
    let Some(to) = pooled.tx.to else {
        let address = contract_address(&pooled.sender, pooled.tx.nonce);
        contracts.insert(address, Registry::new());
        return Outcome {
            success: true,
            gas_used: GAS_DEPLOY,
            contract_address: Some(address),
            logs: Vec::new(),
        };
    };

    let Some(registry) = contracts.get_mut(&to) else {
        return Outcome {
            success: true,
            gas_used: GAS_TRANSFER,
            contract_address: None,
            logs: Vec::new(),
        };
    };

    let result = RegistryCall::decode(&pooled.tx.data)
        .map_err(|e| e.to_string())
        .and_then(|call| {
            apply(registry, &pooled.sender, &call, timestamp).map(|_| call)
        });

    match result {
        Ok(call) => Outcome {
            success: true,
            gas_used: match call {
                RegistryCall::Delete { .. } => GAS_DELETE,
                _ => GAS_WRITE,
            },
            contract_address: None,
            logs: vec![event_log(&to, &call)],
        },
        Err(reason) => {
            debug!(reason = %reason, "[sim] Transaction reverted");
            Outcome {
                success: false,
                gas_used: GAS_REVERTED,
                contract_address: None,
                logs: Vec::new(),
            }
        }
    }
}

/// Run one contract call. `Err` carries the revert reason.
fn apply(
    registry: &mut Registry,
    sender: &Address,
    call: &RegistryCall,
    timestamp: u64,
) -> Result<Vec<u8>, String> {
    match call {
        RegistryCall::Add {
            digest,
            name,
            doc_type,
        } => {
            if registry.contains_key(digest) {
                return Err(REASON_ALREADY_EXISTS.to_string());
            }
            registry.insert(
                *digest,
                VerifyOutput {
                    exists: true,
                    issuer: *sender,
                    timestamp,
                    name: name.clone(),
                    doc_type: doc_type.clone(),
                },
            );
            Ok(Vec::new())
        }
        RegistryCall::Update {
            digest,
            name,
            doc_type,
        } => {
            let record = live_record(registry, digest)?;
            record.name = name.clone();
            record.doc_type = doc_type.clone();
            Ok(Vec::new())
        }
        RegistryCall::Delete { digest } => {
            live_record(registry, digest)?.exists = false;
            Ok(Vec::new())
        }
        RegistryCall::Verify { digest } => registry
            .get(digest)
            .map(VerifyOutput::encode)
            .ok_or_else(|| REASON_DOES_NOT_EXIST.to_string()),
    }
}

fn live_record<'a>(
    registry: &'a mut Registry,
    digest: &Digest32,
) -> Result<&'a mut VerifyOutput, String> {
    registry
        .get_mut(digest)
        .filter(|r| r.exists)
        .ok_or_else(|| REASON_DOES_NOT_EXIST.to_string())
}

fn event_log(contract: &Address, call: &RegistryCall) -> Value {
    let event = match call {
        RegistryCall::Add { .. } => "DocumentAdded(bytes32)",
        RegistryCall::Update { .. } => "DocumentUpdated(bytes32)",
        RegistryCall::Delete { .. } => "DocumentDeleted(bytes32)",
        RegistryCall::Verify { .. } => "DocumentVerified(bytes32)",
    };
    json!({
        "address": to_prefixed_hex(contract),
        "topics": [
            to_prefixed_hex(&keccak256(event.as_bytes())),
            call.digest().to_prefixed_hex(),
        ],
        "data": "0x",
    })
}

fn invalid_transaction(reason: impl std::fmt::Display) -> LedgerError {
    LedgerError::Rpc {
        code: -32000,
        message: format!("invalid transaction: {}", reason),
    }
}

/// In-memory ledger node.
pub struct SimulatedLedger {
    chain_id: u64,
    state: Mutex<SimState>,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID)
    }
}

impl SimulatedLedger {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(SimState::new()),
        }
    }

    /// Mine on every submission (default) or only on [`Self::mine`].
    pub fn set_automine(&self, enabled: bool) {
        self.state.lock().automine = enabled;
    }

    /// Reject transactions that would revert at submission time, the way
    /// development nodes do, instead of mining them as failed.
    pub fn set_revert_on_submit(&self, enabled: bool) {
        self.state.lock().revert_on_submit = enabled;
    }

    /// Fail the next `n` port calls with a connectivity error.
    pub fn fail_next_requests(&self, n: u32) {
        self.state.lock().injected_failures = n;
    }

    /// Mine the pool into a new block. Returns its number.
    pub fn mine(&self) -> u64 {
        self.state.lock().mine_block()
    }

    /// Create an empty registry contract at `address` without a transaction.
    pub fn install_registry(&self, address: Address) {
        let mut state = self.state.lock();
        state.contracts.entry(address).or_default();
        let head = state.head() as usize;
        let snapshot = state.contracts.clone();
        state.snapshots[head] = snapshot;
    }

    pub fn is_contract(&self, address: &Address) -> bool {
        self.state.lock().contracts.contains_key(address)
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pool.len()
    }

    pub fn head_number(&self) -> u64 {
        self.state.lock().head()
    }

    /// Current contract state for `digest`, tombstones included.
    pub fn document(&self, contract: &Address, digest: &Digest32) -> Option<DocumentRecord> {
        self.state
            .lock()
            .contracts
            .get(contract)?
            .get(digest)
            .cloned()
            .map(|output| output.into_record(*digest))
    }

    async fn enter(&self) -> Result<(), LedgerError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if state.injected_failures > 0 {
            state.injected_failures -= 1;
            return Err(LedgerError::Connectivity(
                "simulated outage: connection refused".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.enter().await?;
        Ok(self.chain_id)
    }

    async fn nonce(&self, address: &Address) -> Result<u64, LedgerError> {
        self.enter().await?;
        Ok(self.state.lock().pending_nonce(address))
    }

    async fn gas_price(&self) -> Result<U256, LedgerError> {
        self.enter().await?;
        Ok(U256::from(SIMULATED_GAS_PRICE))
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        self.enter().await?;
        let state = self.state.lock();

        let (contracts, timestamp) = match request.block {
            BlockTag::Latest | BlockTag::Pending => {
                (&state.contracts, GENESIS_TIMESTAMP + state.head() + 1)
            }
            BlockTag::Number(n) => {
                let snapshot = state.snapshots.get(n as usize).ok_or(LedgerError::Rpc {
                    code: -32000,
                    message: "header not found".into(),
                })?;
                (snapshot, GENESIS_TIMESTAMP + n)
            }
        };

        let Some(registry) = contracts.get(&request.to) else {
            return Ok(Vec::new());
        };

        let call = RegistryCall::decode(&request.data)
            .map_err(|_| LedgerError::Reverted { reason: None })?;
        let mut scratch = registry.clone();
        apply(
            &mut scratch,
            &request.from.unwrap_or([0u8; 20]),
            &call,
            timestamp,
        )
        .map_err(|reason| LedgerError::Reverted {
            reason: Some(reason),
        })
    }

    async fn submit(&self, raw: &[u8]) -> Result<TxHash, LedgerError> {
        self.enter().await?;

        let (tx, signature) = LegacyTransaction::decode_signed(raw).map_err(invalid_transaction)?;
        let (sender, chain_id) = recover_sender(&tx, &signature).map_err(invalid_transaction)?;
        if chain_id != Some(self.chain_id) {
            return Err(invalid_transaction(format!(
                "chain id {:?} does not match {}",
                chain_id, self.chain_id
            )));
        }

        let mut state = self.state.lock();

        let expected = state.pending_nonce(&sender);
        if tx.nonce < expected {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("nonce too low: next nonce {}, tx nonce {}", expected, tx.nonce),
            });
        }
        if tx.nonce > expected {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("nonce too high: next nonce {}, tx nonce {}", expected, tx.nonce),
            });
        }
        if tx.gas_limit < GAS_TRANSFER {
            return Err(invalid_transaction("intrinsic gas too low"));
        }

        if state.revert_on_submit {
            if let Some(registry) = tx.to.and_then(|to| state.contracts.get(&to)) {
                let call = RegistryCall::decode(&tx.data)
                    .map_err(|_| LedgerError::Reverted { reason: None })?;
                let timestamp = GENESIS_TIMESTAMP + state.head() + 1;
                apply(&mut registry.clone(), &sender, &call, timestamp).map_err(|reason| {
                    LedgerError::Reverted {
                        reason: Some(reason),
                    }
                })?;
            }
        }

        let hash = transaction_hash(raw);
        if state.transactions.contains_key(&hash) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "already known".into(),
            });
        }

        state.transactions.insert(
            hash,
            RpcTransaction {
                hash,
                from: sender,
                to: tx.to,
                nonce: tx.nonce,
                gas: tx.gas_limit,
                gas_price: tx.gas_price,
                value: tx.value,
                input: tx.data.clone(),
                block_number: None,
            },
        );
        state.pool.push(PooledTx { hash, sender, tx });

        if state.automine {
            state.mine_block();
        }

        Ok(hash)
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<RpcReceipt>, LedgerError> {
        self.enter().await?;
        Ok(self.state.lock().receipts.get(tx_hash).cloned())
    }

    async fn transaction(&self, tx_hash: &TxHash) -> Result<Option<RpcTransaction>, LedgerError> {
        self.enter().await?;
        Ok(self.state.lock().transactions.get(tx_hash).cloned())
    }

    async fn block(&self, number: u64, full: bool) -> Result<Option<RpcBlock>, LedgerError> {
        self.enter().await?;
        let state = self.state.lock();
        let Some(block) = state.blocks.get(number as usize) else {
            return Ok(None);
        };

        let transactions = if full {
            BlockTransactions::Full(
                block
                    .transactions
                    .iter()
                    .filter_map(|h| state.transactions.get(h).cloned())
                    .collect(),
            )
        } else {
            BlockTransactions::Hashes(block.transactions.clone())
        };

        Ok(Some(RpcBlock {
            number: block.number,
            hash: block.hash,
            timestamp: block.timestamp,
            transactions,
        }))
    }

    async fn latest_block_number(&self) -> Result<u64, LedgerError> {
        self.enter().await?;
        Ok(self.state.lock().head())
    }
}
