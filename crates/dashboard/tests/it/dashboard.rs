use alloy_primitives::{Address, TxHash, address};
use alloy_rpc_types::TransactionRequest;
use futures::{FutureExt, StreamExt};
use serde_json::json;
use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};
use walletdeck::{
    Config, Dashboard, DashboardError,
    config::ConfigError,
    transactions::{Badge, TxOutcome, TxStatus},
    wallets::{
        ConnectionError, ConnectorRegistry, ConnectorStore, MemoryConnectorStore, NetworkError,
        NetworkState, SubmitError,
    },
};
use walletdeck_test_utils::{MockConnector, MockStatusSource, RecordingHost, init_tracing};

const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");

fn config() -> Config {
    Config {
        chain_id: 56,
        supported_chains: vec![56, 97],
        connectors: vec!["injected".to_string()],
        strict_misuse: Some(false),
        ..Default::default()
    }
}

fn dashboard(config: Config, wallet: &MockConnector) -> Dashboard {
    init_tracing();
    Dashboard::builder(config, ConnectorRegistry::new().with(wallet.clone()))
        .store(Arc::new(MemoryConnectorStore::new()))
        .build()
        .unwrap()
}

#[test]
fn build_validates_config() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let config = Config { chain_id: 137, ..config() };
    let err = Dashboard::builder(config, ConnectorRegistry::new().with(wallet)).build().unwrap_err();
    assert!(matches!(err, DashboardError::Config(ConfigError::UnsupportedAppChain(137))), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn start_restores_last_connector() {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, 56);
    let store = Arc::new(MemoryConnectorStore::with_id("injected"));
    let dashboard = Dashboard::builder(config(), ConnectorRegistry::new().with(wallet.clone()))
        .store(store.clone())
        .build()
        .unwrap();

    let session = dashboard.start().await.unwrap();
    assert_eq!(session.account, ALICE);
    assert_eq!(dashboard.network().state(), NetworkState::Matched);
    assert_eq!(store.load().as_deref(), Some("injected"));

    // a second start does not spawn the tasks again
    dashboard.start().await;
    assert_eq!(wallet.activations(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn start_without_auto_connect() {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, 56);
    let dashboard = Dashboard::builder(
        Config { auto_connect: false, ..config() },
        ConnectorRegistry::new().with(wallet.clone()),
    )
    .store(Arc::new(MemoryConnectorStore::with_id("injected")))
    .build()
    .unwrap();

    assert_eq!(dashboard.start().await, None);
    assert_eq!(wallet.activations(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_requires_connection_and_chain() {
    let wallet = MockConnector::new("injected", ALICE, 97);
    let dashboard = dashboard(config(), &wallet);

    let err = dashboard
        .submit_transaction(TransactionRequest::default(), "swap", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Connection(ConnectionError::NotConnected)), "{err}");

    dashboard.manager().activate("injected").await.unwrap();
    dashboard.network().sync();
    let err = dashboard
        .submit_transaction(TransactionRequest::default(), "swap", json!({}))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DashboardError::Network(NetworkError::Mismatch { current: Some(97), required: 56 })),
        "{err}"
    );
    assert!(wallet.sent().is_empty());
    assert!(!dashboard.dialog().is_open());

    dashboard.network().confirm().await.unwrap();
    dashboard.submit_transaction(TransactionRequest::default(), "swap", json!({})).await.unwrap();
    assert_eq!(dashboard.ledger().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_submission_keeps_dialog_error() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let dashboard = dashboard(config(), &wallet);
    dashboard.manager().activate("injected").await.unwrap();

    wallet.push_submission(Err(SubmitError::UserRejected));
    let err = dashboard
        .submit_transaction(TransactionRequest::default(), "approve", json!({"token": "CAKE"}))
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Connection(ConnectionError::Submit(SubmitError::UserRejected))));

    let dialog = dashboard.dialog().state();
    assert!(dialog.is_open);
    assert_eq!(dialog.kind.as_deref(), Some("approve"));
    assert_eq!(dialog.hash, None);
    assert_eq!(dialog.error.as_deref(), Some("user rejected the transaction"));
    assert!(dashboard.ledger().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn submission_focuses_dialog() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let host = Arc::new(RecordingHost::new());
    let dashboard = Dashboard::builder(config(), ConnectorRegistry::new().with(wallet.clone()))
        .store(Arc::new(MemoryConnectorStore::new()))
        .navigator(host.clone())
        .build()
        .unwrap();
    dashboard.manager().activate("injected").await.unwrap();

    let hash = dashboard
        .submit_transaction(TransactionRequest::default(), "swap", json!({"in": "BNB"}))
        .await
        .unwrap();
    let dialog = dashboard.dialog().state();
    assert_eq!(dialog.hash, Some(hash));
    assert_eq!(dialog.metadata, json!({"in": "BNB"}));

    assert!(dashboard.dialog().close());
    assert!(host.navigations().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_hash_is_logged_when_not_strict() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let dashboard = dashboard(config(), &wallet);
    dashboard.manager().activate("injected").await.unwrap();

    let hash = TxHash::with_last_byte(9);
    wallet.push_submission(Ok(hash));
    wallet.push_submission(Ok(hash));
    dashboard.submit_transaction(TransactionRequest::default(), "swap", json!({})).await.unwrap();
    dashboard.submit_transaction(TransactionRequest::default(), "swap", json!({})).await.unwrap();
    assert_eq!(dashboard.ledger().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_hash_panics_when_strict() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let dashboard = dashboard(Config { strict_misuse: Some(true), ..config() }, &wallet);
    dashboard.manager().activate("injected").await.unwrap();

    let hash = TxHash::with_last_byte(9);
    wallet.push_submission(Ok(hash));
    wallet.push_submission(Ok(hash));
    let first = dashboard.submit_transaction(TransactionRequest::default(), "swap", json!({})).await;
    assert_eq!(first.ok(), Some(hash));

    let second = AssertUnwindSafe(dashboard.submit_transaction(
        TransactionRequest::default(),
        "swap",
        json!({}),
    ))
    .catch_unwind()
    .await;
    let payload = second.err().expect("duplicate hash did not panic");
    let message = payload.downcast_ref::<String>().map(String::as_str).unwrap_or_default();
    assert!(message.starts_with("internal misuse:"), "{message}");
    assert!(message.ends_with("is already tracked"), "{message}");
    assert_eq!(dashboard.ledger().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn badge_follows_active_chain() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let dashboard = dashboard(config(), &wallet);
    assert_eq!(dashboard.badge(), Badge::Hidden);

    dashboard.manager().activate("injected").await.unwrap();
    dashboard.submit_transaction(TransactionRequest::default(), "swap", json!({})).await.unwrap();
    dashboard.ledger().record(TxHash::with_last_byte(0xee), 97, "bridge", json!({})).unwrap();
    assert_eq!(dashboard.badge(), Badge::Count(1));

    assert_eq!(dashboard.open_notifications(), 2);
    assert_eq!(dashboard.badge(), Badge::Dot);
}

#[tokio::test(flavor = "multi_thread")]
async fn watcher_finalizes_pending_transactions() {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, 56);
    let source = Arc::new(MockStatusSource::new());
    let dashboard = Dashboard::builder(
        Config { tx_poll_interval_ms: 10, ..config() },
        ConnectorRegistry::new().with(wallet.clone()),
    )
    .store(Arc::new(MemoryConnectorStore::new()))
    .status_source(source.clone())
    .build()
    .unwrap();
    dashboard.start().await;
    dashboard.manager().activate("injected").await.unwrap();

    let hash = dashboard
        .submit_transaction(TransactionRequest::default(), "swap", json!({}))
        .await
        .unwrap();
    source.set(56, hash, TxOutcome::Confirmed);

    tokio::time::timeout(Duration::from_secs(5), async {
        while dashboard.ledger().pending_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(dashboard.ledger().get(&hash).unwrap().status, TxStatus::Confirmed);
}

#[tokio::test(flavor = "multi_thread")]
async fn submits_right_after_connecting() {
    let wallet = MockConnector::new("injected", ALICE, 56);
    let dashboard = dashboard(config(), &wallet);

    // no start, no explicit sync
    dashboard.manager().activate("injected").await.unwrap();
    let hash = dashboard
        .submit_transaction(TransactionRequest::default(), "swap", json!({}))
        .await
        .unwrap();
    assert_eq!(wallet.sent().len(), 1);
    assert_eq!(dashboard.ledger().get(&hash).unwrap().chain_id, 56);
}

#[tokio::test(flavor = "multi_thread")]
async fn started_dashboard_resolves_wrong_chain() {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, 97);
    let host = Arc::new(RecordingHost::new());
    let dashboard = Dashboard::builder(config(), ConnectorRegistry::new().with(wallet.clone()))
        .store(Arc::new(MemoryConnectorStore::new()))
        .reload(host.clone())
        .build()
        .unwrap();
    let mut network = dashboard.network().subscribe();
    assert_eq!(dashboard.start().await, None);

    // the sync task reports the mismatch once the wallet connects on the wrong chain
    dashboard.manager().activate("injected").await.unwrap();
    let state = tokio::time::timeout(Duration::from_secs(5), network.next()).await.unwrap();
    assert!(matches!(state, Some(NetworkState::MismatchDetected { current: 97, .. })), "{state:?}");

    let err = dashboard
        .submit_transaction(TransactionRequest::default(), "swap", json!({}))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DashboardError::Network(NetworkError::Mismatch { current: Some(97), required: 56 })),
        "{err}"
    );

    dashboard.network().confirm().await.unwrap();
    assert_eq!(wallet.chain_id(), 56);
    // the wallet announces the switch, which reloads the host
    assert_eq!(host.reloads(), 1);
    dashboard.submit_transaction(TransactionRequest::default(), "swap", json!({})).await.unwrap();
    assert_eq!(dashboard.badge(), Badge::Count(1));

    // the user moves the wallet elsewhere, the host reloads
    wallet.emit_chain_changed(1);
    assert_eq!(host.reloads(), 2);
}
