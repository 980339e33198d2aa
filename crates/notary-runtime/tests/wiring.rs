//! # Runtime Wiring Tests
//!
//! Deploy, register and verify through the wired runtime against the
//! in-memory ledger, with the receipt database and contract file on disk.

use std::sync::Arc;
use std::time::Duration;

use dl_02_ledger_client::{LedgerClient, SimulatedLedger};
use dl_05_block_monitor::StartPoint;
use notary_runtime::{contract_file, Access, ConfigError, Notary, NotaryConfig};
use zeroize::Zeroizing;

const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn config_in(dir: &std::path::Path) -> NotaryConfig {
    let mut config = NotaryConfig::default();
    config.signer.private_key = Some(Zeroizing::new(DEV_KEY.to_string()));
    config.store.db_path = dir.join("logi").join("blockchain_logs.db");
    config.registry.contract_file = dir.join("data").join("contract_address.txt");
    config.confirmation.poll_interval = Duration::from_millis(5);
    config.confirmation.timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_deploy_persists_address_for_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let ledger: Arc<dyn LedgerClient> = Arc::new(SimulatedLedger::default());
    let config = config_in(dir.path());

    let notary = Notary::with_ledger(config.clone(), Arc::clone(&ledger), Access::Signing)
        .await
        .unwrap();
    assert!(notary.registry().is_err());
    let address = notary.deploy(vec![0x60, 0x80]).await.unwrap();
    assert_eq!(
        contract_file::load(&config.registry.contract_file).unwrap(),
        Some(address)
    );

    // A fresh runtime picks the contract up from the file
    let notary = Notary::with_ledger(config, ledger, Access::Signing)
        .await
        .unwrap();
    let registry = notary.registry().unwrap();
    assert_eq!(registry.contract(), address);

    registry
        .add_document(b"hello", "contract.pdf", "legal")
        .await
        .unwrap();
    let verification = registry.verify_document(b"hello").await.unwrap();
    assert!(verification.matched);
    assert_eq!(
        verification.record.unwrap().issuer,
        notary.tracker().session().sender()
    );

    // Deploy and add are both in the database
    assert_eq!(notary.tracker().receipts(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_signing_commands_require_key() {
    let dir = tempfile::tempdir().unwrap();
    let ledger: Arc<dyn LedgerClient> = Arc::new(SimulatedLedger::default());
    let mut config = config_in(dir.path());
    config.signer.private_key = None;

    let err = Notary::with_ledger(config.clone(), Arc::clone(&ledger), Access::Signing)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingPrivateKey)
    ));

    // Reads work without one
    assert!(Notary::with_ledger(config, ledger, Access::ReadOnly)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_chain_id_mismatch_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ledger: Arc<dyn LedgerClient> = Arc::new(SimulatedLedger::default());
    let mut config = config_in(dir.path());
    config.ledger.expected_chain_id = Some(1);

    let err = Notary::with_ledger(config, ledger, Access::Signing)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("chain id"));
}

#[tokio::test]
async fn test_monitor_shares_receipt_store() {
    let dir = tempfile::tempdir().unwrap();
    let ledger: Arc<dyn LedgerClient> = Arc::new(SimulatedLedger::default());
    let notary = Notary::with_ledger(config_in(dir.path()), ledger, Access::Signing)
        .await
        .unwrap();
    notary.deploy(vec![0x60, 0x80]).await.unwrap();

    let mut monitor = notary.monitor(StartPoint::Block(1));
    let report = monitor.poll_once().await.unwrap();
    assert_eq!(report.blocks_processed, 1);
    // The tracker already stored the deployment receipt
    assert_eq!(report.receipts_persisted, 0);
}
