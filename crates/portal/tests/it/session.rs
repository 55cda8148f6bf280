//! Session connector and portal control-flow tests.

use alloy_primitives::{address, Address, U256};
use std::sync::Arc;
use waveportal::{
    ActionState, FeedStatus, Portal, PortalError, SessionConnector, WalletProvider, WaveRecord,
};
use waveportal_test_utils::{init_tracing, MockLedger, MockWallet};

const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

fn portal(ledger: &MockLedger, wallet: Option<MockWallet>) -> Portal {
    let wallet = wallet.map(|wallet| Arc::new(wallet) as Arc<dyn WalletProvider>);
    Portal::new(Arc::new(ledger.clone()), wallet)
}

#[tokio::test(flavor = "multi_thread")]
async fn detect_identity_without_wallet_is_not_an_error() {
    init_tracing();
    let connector = SessionConnector::new(None);
    assert!(!connector.has_wallet());
    assert_eq!(connector.detect_identity().await.unwrap(), None);
    assert_eq!(connector.current_identity(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn can_detect_an_authorized_identity() {
    init_tracing();
    let wallet = MockWallet::authorized(ALICE);
    let connector = SessionConnector::new(Some(Arc::new(wallet)));

    let mut identities = connector.identity_watch();
    assert_eq!(connector.detect_identity().await.unwrap(), Some(ALICE));
    assert_eq!(connector.current_identity(), Some(ALICE));

    identities.changed().await.unwrap();
    assert_eq!(*identities.borrow(), Some(ALICE));
}

#[tokio::test(flavor = "multi_thread")]
async fn detect_identity_does_not_prompt() {
    init_tracing();
    // Nothing authorized yet; only an explicit connect may prompt.
    let wallet = MockWallet::granting(ALICE);
    let connector = SessionConnector::new(Some(Arc::new(wallet)));
    assert_eq!(connector.detect_identity().await.unwrap(), None);
    assert_eq!(connector.current_identity(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_wallet_leaves_read_paths_live() {
    init_tracing();
    let ledger = MockLedger::new();
    ledger.push_history([WaveRecord::new(ALICE, 1_000, "gm")]);
    let portal = portal(&ledger, None);

    let err = portal.connect().await.unwrap_err();
    assert!(matches!(err, PortalError::WalletUnavailable));
    assert_eq!(portal.identity(), None);

    let err = portal.wave("hi").await.unwrap_err();
    assert!(matches!(err, PortalError::NotConnected));
    assert_eq!(portal.action_state(), ActionState::Idle);

    // Reads never depended on the wallet.
    assert_eq!(portal.refresh_total().await.unwrap(), U256::from(1));
    assert_eq!(portal.reconciler().load_history().await.unwrap(), 1);
    assert_eq!(portal.waves().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_connect_leaves_identity_unset() {
    init_tracing();
    let ledger = MockLedger::new();
    let portal = portal(&ledger, Some(MockWallet::rejecting()));

    let err = portal.connect().await.unwrap_err();
    assert!(matches!(err, PortalError::UserRejected));
    assert_eq!(portal.identity(), None);

    let err = portal.sync().await.unwrap_err();
    assert!(matches!(err, PortalError::NotConnected));
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_publishes_identity_and_total() {
    init_tracing();
    let ledger = MockLedger::with_signer(ALICE);
    ledger.push_history([WaveRecord::new(ALICE, 1_000, "gm"), WaveRecord::new(BOB, 1_001, "gn")]);
    let portal = portal(&ledger, Some(MockWallet::granting(ALICE)));

    let mut identities = portal.identity_watch();
    assert_eq!(portal.connect().await.unwrap(), ALICE);
    assert_eq!(portal.identity(), Some(ALICE));
    assert_eq!(portal.total(), U256::from(2));

    identities.changed().await.unwrap();
    assert_eq!(*identities.borrow(), Some(ALICE));
}

#[tokio::test(flavor = "multi_thread")]
async fn wave_refreshes_the_total() {
    init_tracing();
    let ledger = MockLedger::with_signer(ALICE);
    let portal = portal(&ledger, Some(MockWallet::granting(ALICE)));
    portal.connect().await.unwrap();
    assert_eq!(portal.total(), U256::ZERO);

    portal.wave("gm").await.unwrap();
    assert!(matches!(portal.action_state(), ActionState::Confirmed { .. }));
    assert_eq!(portal.total(), U256::from(1));
    assert_eq!(portal.waves().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn can_run_a_full_session() {
    init_tracing();
    let ledger = MockLedger::with_signer(ALICE);
    ledger.push_history([WaveRecord::new(BOB, 1_000, "old")]);
    let portal = portal(&ledger, Some(MockWallet::authorized(ALICE)));

    // Identity, then history, then live feed, then a submission.
    assert_eq!(portal.detect_identity().await.unwrap(), Some(ALICE));
    let mut subscription = portal.sync().await.unwrap();
    assert_eq!(portal.waves().len(), 1);

    let mut feed = portal.feed_watch();
    feed.wait_for(|status| *status == FeedStatus::Live).await.unwrap();

    portal.wave("gm").await.unwrap();
    assert_eq!(portal.waves().len(), 2);
    assert_eq!(portal.waves().records()[0].message, "old");
    assert_eq!(portal.total(), U256::from(2));

    subscription.unsubscribe().await;
    assert!(!subscription.is_active());
}
