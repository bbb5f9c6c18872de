use alloy_primitives::{Address, address};
use futures::StreamExt;
use std::{sync::Arc, time::Duration};
use walletdeck_test_utils::{MockConnector, RecordingHost, init_tracing};
use walletdeck_wallets::{
    ConnectionManager, ConnectorRegistry, NetworkCoordinator, NetworkError, NetworkState,
    SwitchError, SwitchReason, SwitchRequest,
};

const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");

/// A manager connected through a wallet on `wallet_chain`.
async fn connected(wallet_chain: u64) -> (ConnectionManager, MockConnector) {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, wallet_chain);
    let manager = ConnectionManager::builder(ConnectorRegistry::new().with(wallet.clone()))
        .reload(Arc::new(RecordingHost::new()))
        .build();
    manager.activate("injected").await.unwrap();
    (manager, wallet)
}

fn page_request(chain_id: u64) -> SwitchRequest {
    SwitchRequest { chain_id, reason: SwitchReason::PageRequirement }
}

#[tokio::test(flavor = "multi_thread")]
async fn matched_when_wallet_is_on_required_chain() {
    let (manager, _) = connected(56).await;
    let network = NetworkCoordinator::new(manager, 56);
    assert_eq!(network.state(), NetworkState::Matched);
    assert_eq!(network.ensure_chain().unwrap(), 56);
    assert_eq!(network.pending_request(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnected_wallet_is_not_prompted() {
    init_tracing();
    let manager = ConnectionManager::new(ConnectorRegistry::new());
    let network = NetworkCoordinator::new(manager, 56);
    assert_eq!(network.state(), NetworkState::Matched);
    assert!(matches!(
        network.ensure_chain(),
        Err(NetworkError::Mismatch { current: None, required: 56 })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn confirm_resolves_mismatch() {
    let (manager, wallet) = connected(1).await;
    let network = NetworkCoordinator::new(manager.clone(), 56);
    assert_eq!(network.state(), NetworkState::MismatchDetected { current: 1, request: page_request(56) });

    network.confirm().await.unwrap();
    assert_eq!(network.state(), NetworkState::Matched);
    assert_eq!(wallet.chain_id(), 56);
    assert_eq!(manager.state().chain_id(), Some(56));
    assert_eq!(network.ensure_chain().unwrap(), 56);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_switch_walk() {
    let (manager, wallet) = connected(1).await;
    let network = NetworkCoordinator::new(manager, 56);
    let mut updates = network.subscribe();

    wallet.push_switch(Err(SwitchError::UserRejected));
    let err = network.confirm().await.unwrap_err();
    assert!(matches!(err, NetworkError::Switch(SwitchError::UserRejected)), "{err}");

    assert_eq!(updates.next().await, Some(NetworkState::SwitchInFlight { request: page_request(56) }));
    let failed = NetworkState::SwitchFailed { request: page_request(56), error: SwitchError::UserRejected };
    assert_eq!(updates.next().await, Some(failed.clone()));
    assert_eq!(network.state(), failed);

    // dismissing the error keeps the mismatch
    network.dismiss_error();
    assert_eq!(network.state(), NetworkState::MismatchDetected { current: 1, request: page_request(56) });

    // retry succeeds
    network.confirm().await.unwrap();
    assert_eq!(network.state(), NetworkState::Matched);
    assert_eq!(wallet.switches(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_from_failed_state() {
    let (manager, wallet) = connected(1).await;
    let network = NetworkCoordinator::new(manager, 56);

    wallet.push_switch(Err(SwitchError::UnknownChain(56)));
    assert!(network.confirm().await.is_err());
    assert!(matches!(
        network.state(),
        NetworkState::SwitchFailed { error: SwitchError::UnknownChain(56), .. }
    ));

    network.confirm().await.unwrap();
    assert!(network.state().is_matched());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_closes_prompt_without_enforcing() {
    let (manager, _) = connected(1).await;
    let network = NetworkCoordinator::new(manager, 56);

    network.cancel();
    assert_eq!(network.state(), NetworkState::Matched);
    assert_eq!(network.pending_request(), None);
    assert!(matches!(
        network.ensure_chain(),
        Err(NetworkError::Mismatch { current: Some(1), required: 56 })
    ));

    // the same mismatch is not prompted again
    assert_eq!(network.sync(), NetworkState::Matched);

    // a new requirement is
    network.require_chain(97);
    assert_eq!(network.state(), NetworkState::MismatchDetected { current: 1, request: page_request(97) });
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_after_failure() {
    let (manager, wallet) = connected(1).await;
    let network = NetworkCoordinator::new(manager, 56);
    wallet.push_switch(Err(SwitchError::UserRejected));
    let _ = network.confirm().await;

    network.cancel();
    assert_eq!(network.state(), NetworkState::Matched);
}

#[tokio::test(flavor = "multi_thread")]
async fn user_requested_switch() {
    let (manager, wallet) = connected(56).await;
    let network = NetworkCoordinator::new(manager, 56);

    // switching to the active chain is a no-op
    network.switch_to(56).await.unwrap();
    assert_eq!(wallet.switches(), 0);

    let state = network.request_switch(97);
    assert_eq!(
        state,
        NetworkState::MismatchDetected {
            current: 56,
            request: SwitchRequest { chain_id: 97, reason: SwitchReason::UserRequested },
        }
    );
    network.confirm().await.unwrap();
    assert_eq!(network.required_chain(), 97);
    assert_eq!(wallet.chain_id(), 97);
    assert!(network.state().is_matched());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_confirm_is_refused() {
    let (manager, _) = connected(1).await;
    let network = NetworkCoordinator::new(manager, 56);
    let mut updates = network.subscribe();

    // hold the switch in flight by confirming from another task and inspecting the first update
    let pending = tokio::spawn({
        let network = network.clone();
        async move { network.confirm().await }
    });
    assert!(matches!(updates.next().await, Some(NetworkState::SwitchInFlight { .. })));
    match network.confirm().await {
        Err(NetworkError::SwitchInFlight) | Ok(()) => {}
        Err(err) => panic!("unexpected error: {err}"),
    }
    pending.await.unwrap().unwrap();
    assert!(network.state().is_matched());
}

#[tokio::test(flavor = "multi_thread")]
async fn spawn_sync_follows_wallet() {
    let (manager, wallet) = connected(56).await;
    let network = NetworkCoordinator::new(manager.clone(), 56);
    let mut updates = network.subscribe();
    let task = network.spawn_sync();

    // the wallet moves on its own; the manager learns it through a switch it drove
    manager.switch_network(1).await.unwrap();
    assert_eq!(wallet.chain_id(), 1);

    let state = tokio::time::timeout(Duration::from_secs(5), updates.next()).await.unwrap();
    assert_eq!(state, Some(NetworkState::MismatchDetected { current: 1, request: page_request(56) }));
    task.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn follows_connection_made_after_creation() {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, 56);
    let manager = ConnectionManager::new(ConnectorRegistry::new().with(wallet.clone()));
    let network = NetworkCoordinator::new(manager.clone(), 56);

    // no sync task is running; the coordinator reads the manager's chain on demand
    manager.activate("injected").await.unwrap();
    assert_eq!(network.ensure_chain().unwrap(), 56);
    assert!(network.state().is_matched());
}

#[tokio::test(flavor = "multi_thread")]
async fn confirm_switches_wallet_connected_after_creation() {
    init_tracing();
    let wallet = MockConnector::new("injected", ALICE, 1);
    let manager = ConnectionManager::builder(ConnectorRegistry::new().with(wallet.clone()))
        .reload(Arc::new(RecordingHost::new()))
        .build();
    let network = NetworkCoordinator::new(manager.clone(), 56);
    assert!(network.state().is_matched());

    manager.activate("injected").await.unwrap();
    assert!(matches!(
        network.ensure_chain(),
        Err(NetworkError::Mismatch { current: Some(1), required: 56 })
    ));
    assert_eq!(network.state(), NetworkState::MismatchDetected { current: 1, request: page_request(56) });

    network.confirm().await.unwrap();
    assert_eq!(wallet.switches(), 1);
    assert_eq!(network.ensure_chain().unwrap(), 56);
}
