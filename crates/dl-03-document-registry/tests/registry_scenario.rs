//! # Registry Scenarios
//!
//! Full document lifecycles against the in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use dl_01_canonicalizer::hash;
use dl_02_ledger_client::adapters::simulator::{DEFAULT_CHAIN_ID, GENESIS_TIMESTAMP};
use dl_02_ledger_client::SimulatedLedger;
use dl_03_document_registry::{DocumentRegistry, RegistryError};
use dl_04_transaction_tracker::{
    InMemoryReceiptStore, LedgerSession, ReceiptStore, SigningCredential, TrackerConfig,
    TransactionTracker,
};

const REGISTRY: [u8; 20] = [0x5F; 20];

fn registry_on(ledger: &Arc<SimulatedLedger>) -> DocumentRegistry {
    let session = LedgerSession::new(SigningCredential::random(), DEFAULT_CHAIN_ID).with_contract(REGISTRY);
    let tracker = TransactionTracker::new(
        ledger.clone(),
        Arc::new(InMemoryReceiptStore::new()),
        session,
        TrackerConfig {
            confirmation_timeout: Duration::from_secs(5),
            receipt_poll_interval: Duration::from_millis(5),
            ..TrackerConfig::default()
        },
    );
    DocumentRegistry::new(Arc::new(tracker)).unwrap()
}

fn setup() -> (Arc<SimulatedLedger>, DocumentRegistry) {
    let ledger = Arc::new(SimulatedLedger::default());
    ledger.install_registry(REGISTRY);
    let registry = registry_on(&ledger);
    (ledger, registry)
}

// =============================================================================
// Add and verify
// =============================================================================

#[tokio::test]
async fn test_add_then_verify() {
    let (_ledger, registry) = setup();

    let receipt = registry
        .add_document(b"hello", "contract.pdf", "legal")
        .await
        .unwrap();
    assert!(receipt.is_success());

    let verification = registry.verify_document(b"hello").await.unwrap();
    assert!(verification.matched);
    assert_eq!(verification.digest, hash(b"hello"));

    let record = verification.record.unwrap();
    assert_eq!(record.issuer, registry.tracker().session().sender());
    assert_eq!(record.registered_at, receipt.block_timestamp);
    assert_eq!(record.registered_at, GENESIS_TIMESTAMP + receipt.block_number);
    assert_eq!(record.name, "contract.pdf");
    assert_eq!(record.doc_type, "legal");
    assert!(record.exists);
}

#[tokio::test]
async fn test_verify_by_key_matches_content() {
    let (_ledger, registry) = setup();
    registry.add_document(b"hello", "contract.pdf", "legal").await.unwrap();

    let key = hash(b"hello").to_hex();
    let by_key = registry.verify_by_key(&key).await.unwrap();
    let by_content = registry.verify_document(b"hello").await.unwrap();
    assert_eq!(by_key, by_content);

    let prefixed = registry
        .verify_by_key(&hash(b"hello").to_prefixed_hex())
        .await
        .unwrap();
    assert!(prefixed.matched);
}

#[tokio::test]
async fn test_unregistered_content_does_not_match() {
    let (_ledger, registry) = setup();
    let verification = registry.verify_document(b"never added").await.unwrap();
    assert!(!verification.matched);
    assert!(verification.record.is_none());
}

#[tokio::test]
async fn test_different_bytes_do_not_match() {
    let (_ledger, registry) = setup();
    registry.add_document(b"hello", "contract.pdf", "legal").await.unwrap();
    assert!(!registry.verify_document(b"hello!").await.unwrap().matched);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_duplicate_add_from_mined_failure() {
    let (_ledger, registry) = setup();
    registry.add_document(b"hello", "first.pdf", "legal").await.unwrap();

    let err = registry
        .add_document(b"hello", "second.pdf", "legal")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }), "{:?}", err);

    // The failed attempt is still recorded, the record is unchanged
    assert_eq!(registry.tracker().store().count().unwrap(), 2);
    let record = registry.verify_document(b"hello").await.unwrap().record.unwrap();
    assert_eq!(record.name, "first.pdf");
}

#[tokio::test]
async fn test_duplicate_add_rejected_at_submission() {
    let (ledger, registry) = setup();
    registry.add_document(b"hello", "first.pdf", "legal").await.unwrap();
    ledger.set_revert_on_submit(true);

    let err = registry
        .add_document(b"hello", "second.pdf", "legal")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }), "{:?}", err);
    assert_eq!(registry.tracker().store().count().unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_from_another_issuer() {
    let (ledger, registry) = setup();
    registry.add_document(b"hello", "contract.pdf", "legal").await.unwrap();

    let other = registry_on(&ledger);
    let err = other
        .add_document(b"hello", "contract.pdf", "legal")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }));
}

// =============================================================================
// Update and delete
// =============================================================================

#[tokio::test]
async fn test_update_keeps_digest_and_issuer() {
    let (_ledger, registry) = setup();
    let added = registry.add_document(b"hello", "draft.pdf", "legal").await.unwrap();

    registry
        .update_document(b"hello", "final.pdf", "contract")
        .await
        .unwrap();

    let verification = registry.verify_document(b"hello").await.unwrap();
    assert!(verification.matched);
    let record = verification.record.unwrap();
    assert_eq!(record.content_hash, hash(b"hello"));
    assert_eq!(record.name, "final.pdf");
    assert_eq!(record.doc_type, "contract");
    assert_eq!(record.registered_at, added.block_timestamp);
}

#[tokio::test]
async fn test_delete_leaves_tombstone() {
    let (_ledger, registry) = setup();
    registry.add_document(b"hello", "contract.pdf", "legal").await.unwrap();
    registry.delete_document(b"hello").await.unwrap();

    let verification = registry.verify_document(b"hello").await.unwrap();
    assert!(!verification.matched);
    assert!(verification.is_tombstone());
}

#[tokio::test]
async fn test_deleted_key_is_never_reused() {
    let (_ledger, registry) = setup();
    registry.add_document(b"hello", "contract.pdf", "legal").await.unwrap();
    registry.delete_document(b"hello").await.unwrap();

    let err = registry
        .add_document(b"hello", "contract.pdf", "legal")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_update_or_delete_without_live_record() {
    let (_ledger, registry) = setup();

    let err = registry
        .update_document(b"never added", "x", "y")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }), "{:?}", err);

    registry.add_document(b"hello", "contract.pdf", "legal").await.unwrap();
    registry.delete_document(b"hello").await.unwrap();

    assert!(matches!(
        registry.update_document(b"hello", "x", "y").await,
        Err(RegistryError::NotFound { .. })
    ));
    assert!(matches!(
        registry.delete_document(b"hello").await,
        Err(RegistryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_update_mined_before_add_in_same_block() {
    let (ledger, registry) = setup();
    ledger.set_automine(false);

    let miner = async {
        while ledger.pending_count() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        ledger.mine()
    };

    // The update takes nonce 0 and runs first against an empty registry
    let (updated, added, block) = tokio::join!(
        registry.update_document(b"hello", "x", "y"),
        registry.add_document(b"hello", "contract.pdf", "legal"),
        miner,
    );

    assert!(matches!(updated, Err(RegistryError::NotFound { .. })), "{:?}", updated);
    let added = added.unwrap();
    assert!(added.is_success());
    assert_eq!(added.block_number, block);

    let record = registry.verify_document(b"hello").await.unwrap().record.unwrap();
    assert_eq!(record.name, "contract.pdf");
}

#[tokio::test]
async fn test_connectivity_failure_surfaces() {
    let (ledger, registry) = setup();
    ledger.fail_next_requests(1);
    let err = registry.verify_document(b"hello").await.unwrap_err();
    assert!(matches!(err, RegistryError::Ledger(ref e) if e.is_connectivity()), "{:?}", err);
}
