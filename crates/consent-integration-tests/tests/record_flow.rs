//! End-to-end recording: blob store, session, ledger write, read-back.

use std::sync::Arc;
use std::time::Duration;

use consent_blobstore::BlobStoreClient;
use consent_crypto::{ContentRef, SubjectHandle};
use consent_ledger::{ActionType, EventQuery, Origin};
use consent_recorder::{ConsentRecorder, RecorderError};
use consent_session::{SessionEvent, SessionManager};
use consent_test::{
    CountingPinningApi, MockSessionProvider, TEST_COUNTERPARTY, TEST_IDENTIFIER, TestLedger,
    init_test_logging, test_jwt,
};
use serde_json::json;

struct Harness {
    ledger: TestLedger,
    api: Arc<CountingPinningApi>,
    provider: Arc<MockSessionProvider>,
    session: Arc<SessionManager>,
    recorder: ConsentRecorder,
}

fn harness(ledger: TestLedger, jwt: Option<String>) -> Harness {
    init_test_logging();
    let api = CountingPinningApi::new();
    let provider = MockSessionProvider::new(ledger.ledger.clone());
    let session = SessionManager::start(provider.clone());
    let blob_store = BlobStoreClient::new(api.clone(), jwt.as_deref(), "https://gateway.test/ipfs");
    let query = EventQuery::new(Arc::new(ledger.ledger.clone()), ledger.query_config());
    let recorder = ConsentRecorder::new(blob_store, Arc::clone(&session), ledger.writer(), query);
    Harness {
        ledger,
        api,
        provider,
        session,
        recorder,
    }
}

#[tokio::test]
async fn test_grant_without_session_is_synthetic() {
    let h = harness(TestLedger::deployed(), None);

    let result = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            TEST_COUNTERPARTY,
            &ActionType::parse("CONSENT_GRANTED"),
            json!({}),
        )
        .await
        .unwrap();

    assert_eq!(result.origin, Origin::Synthetic);
    assert!(ContentRef::looks_like_cid(result.content_ref.as_str()));
    assert_eq!(result.content_ref.as_str().len(), 44);
    assert_eq!(result.receipt.tx_id().to_hex().len(), 66);
    assert_eq!(result.receipt.block_number, 0);
    assert_eq!(result.receipt.gas_used, 0);
    assert_eq!(h.api.total_calls(), 0);
    assert_eq!(h.provider.request_count(), 0);
}

#[tokio::test]
async fn test_connected_write_is_queryable() {
    let h = harness(TestLedger::deployed(), Some(test_jwt()));
    assert!(h.session.connect().await);

    let granted = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            TEST_COUNTERPARTY,
            &ActionType::ConsentGranted,
            json!({"purpose": "account opening"}),
        )
        .await
        .unwrap();
    let used = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            TEST_COUNTERPARTY,
            &ActionType::IdentityUsed,
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(granted.origin, Origin::Ledger);
    assert_eq!(used.origin, Origin::Ledger);
    assert_eq!(h.api.pin_count(), 2);

    let history = h.recorder.history(TEST_IDENTIFIER).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.origin == Origin::Ledger));
    assert_eq!(history[0].ledger_ref, used.receipt.ledger_ref);
    assert_eq!(history[1].ledger_ref, granted.receipt.ledger_ref);
    assert_eq!(history[1].content_ref.as_ref(), Some(&granted.content_ref));
    assert_eq!(
        history[0].subject,
        SubjectHandle::hash(TEST_IDENTIFIER).unwrap()
    );
}

#[tokio::test]
async fn test_deletion_request_routes_through_usage() {
    let h = harness(TestLedger::deployed(), None);
    assert!(h.session.connect().await);

    let result = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            "Maybank",
            &ActionType::deletion_request(),
            json!({"reason": "account closed"}),
        )
        .await
        .unwrap();
    assert_eq!(result.origin, Origin::Ledger);

    let history = h.recorder.history(TEST_IDENTIFIER).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, ActionType::deletion_request());
}

#[tokio::test]
async fn test_missing_contract_is_a_configuration_error() {
    let h = harness(TestLedger::undeployed(), None);
    assert!(h.session.connect().await);

    let err = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            TEST_COUNTERPARTY,
            &ActionType::ConsentGranted,
            json!({}),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RecorderError::ContractNotDeployed { address } if address == h.ledger.contract
    ));
}

#[tokio::test]
async fn test_ledger_outage_degrades_to_synthetic() {
    let h = harness(TestLedger::deployed(), None);
    assert!(h.session.connect().await);
    h.ledger.ledger.set_offline(true).unwrap();

    let result = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            TEST_COUNTERPARTY,
            &ActionType::IdentityUsed,
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(result.origin, Origin::Synthetic);

    // Queries degrade the same way.
    let history = h.recorder.history(TEST_IDENTIFIER).await.unwrap();
    assert_eq!(history.len(), 6);
    assert!(history.iter().all(|e| e.origin == Origin::Synthetic));
}

#[tokio::test]
async fn test_chain_change_drops_session_before_next_write() {
    let h = harness(TestLedger::deployed(), None);
    let mut events = h.session.subscribe_events();
    assert!(h.session.connect().await);

    h.provider.switch_chain(1);
    let mut saw_chain_change = false;
    while let Ok(Ok(event)) = tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
        if matches!(event, SessionEvent::ChainChanged { chain_id: 1 }) {
            saw_chain_change = true;
            break;
        }
    }
    assert!(saw_chain_change);
    assert!(!h.session.is_connected());

    let result = h
        .recorder
        .record(
            TEST_IDENTIFIER,
            TEST_COUNTERPARTY,
            &ActionType::IdentityUsed,
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(result.origin, Origin::Synthetic);
}
