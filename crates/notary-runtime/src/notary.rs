//! # Component Wiring
//!
//! ```text
//! NotaryConfig ──→ JsonRpcLedgerClient ──→ LedgerSession (chain id, contract)
//!                         │                       │
//!                         └── SqliteReceiptStore ─┴─→ TransactionTracker
//!                                                        ├─→ DocumentRegistry
//!                                                        └─→ BlockMonitor
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dl_02_ledger_client::{JsonRpcLedgerClient, LedgerClient};
use dl_03_document_registry::DocumentRegistry;
use dl_04_transaction_tracker::{
    LedgerSession, SigningCredential, SqliteReceiptStore, TransactionTracker,
};
use dl_05_block_monitor::{BlockMonitor, StartPoint};
use shared_types::{to_prefixed_hex, Address};
use tracing::{debug, info};

use crate::config::{ConfigError, NotaryConfig};
use crate::contract_file;

/// Whether the command needs the configured signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads only. Falls back to an ephemeral identity without a key.
    ReadOnly,
    Signing,
}

/// Wired engine for one command invocation.
pub struct Notary {
    config: NotaryConfig,
    ledger: Arc<dyn LedgerClient>,
    tracker: Arc<TransactionTracker>,
}

impl Notary {
    /// Connect to the configured JSON-RPC endpoint.
    pub async fn connect(config: NotaryConfig, access: Access) -> Result<Self> {
        let ledger = JsonRpcLedgerClient::with_timeout(
            config.ledger.rpc_url.clone(),
            config.ledger.request_timeout,
        )?;
        info!(rpc_url = %config.ledger.rpc_url, "Using ledger endpoint");
        Self::with_ledger(config, Arc::new(ledger), access).await
    }

    pub async fn with_ledger(
        config: NotaryConfig,
        ledger: Arc<dyn LedgerClient>,
        access: Access,
    ) -> Result<Self> {
        match access {
            Access::Signing => config.validate_for_signing()?,
            Access::ReadOnly => config.validate()?,
        }

        let credential = match &config.signer.private_key {
            Some(key) => SigningCredential::from_hex(key).map_err(|_| ConfigError::InvalidPrivateKey)?,
            None if access == Access::ReadOnly => {
                debug!("No private key configured; using an ephemeral read identity");
                SigningCredential::random()
            }
            None => return Err(ConfigError::MissingPrivateKey.into()),
        };

        let mut session = LedgerSession::connect(credential, ledger.as_ref())
            .await
            .context("connecting to ledger")?;
        if let Some(expected) = config.ledger.expected_chain_id {
            if session.chain_id() != expected {
                bail!(
                    "node reports chain id {}, configuration expects {}",
                    session.chain_id(),
                    expected
                );
            }
        }

        let contract = match config.registry.contract_address {
            Some(address) => Some(address),
            None => contract_file::load(&config.registry.contract_file)?,
        };
        if let Some(contract) = contract {
            session = session.with_contract(contract);
        }

        let store = SqliteReceiptStore::open(&config.store.db_path).with_context(|| {
            format!("opening receipt store {}", config.store.db_path.display())
        })?;

        info!(
            sender = %to_prefixed_hex(&session.sender()),
            chain_id = session.chain_id(),
            contract = %contract.map(|c| to_prefixed_hex(&c)).unwrap_or_else(|| "-".into()),
            "Session ready"
        );

        let tracker = Arc::new(TransactionTracker::new(
            Arc::clone(&ledger),
            Arc::new(store),
            session,
            config.tracker_config(),
        ));

        Ok(Self {
            config,
            ledger,
            tracker,
        })
    }

    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<TransactionTracker> {
        &self.tracker
    }

    pub fn registry(&self) -> Result<DocumentRegistry> {
        let registry = DocumentRegistry::new(Arc::clone(&self.tracker))
            .context("no registry contract: run `notary deploy` or set DL_CONTRACT_ADDRESS")?;
        Ok(registry.with_revert_table(self.config.registry.revert_table()))
    }

    /// Deploy the registry and record its address in the contract file.
    pub async fn deploy(&self, bytecode: Vec<u8>) -> Result<Address> {
        let address = self.tracker.deploy(bytecode).await.context("deploying registry")?;
        contract_file::save(&self.config.registry.contract_file, &address)?;
        Ok(address)
    }

    pub fn monitor(&self, start: StartPoint) -> BlockMonitor {
        BlockMonitor::new(
            Arc::clone(&self.ledger),
            Arc::clone(self.tracker.store()),
            self.config.monitor_config(start),
        )
    }
}
