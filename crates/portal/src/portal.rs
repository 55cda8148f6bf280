use alloy_primitives::{Address, TxHash, U256};
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    collection::WaveCollection,
    error::PortalError,
    ledger::Ledger,
    reconciler::{Reconciler, ReconcilerConfig, Subscription},
    session::SessionConnector,
    types::{ActionState, FeedStatus},
    wallet::WalletProvider,
};

/// Composition root owning the session connector and the reconciler.
///
/// The portal pins the control flow of a session: establish an identity,
/// bulk-fetch the history, open the live feed, then accept wave
/// submissions. [`sync`] and [`wave`] enforce the identity gate explicitly
/// with [`PortalError::NotConnected`] instead of waiting on the identity
/// slot. All observable state (identity, collection, action, feed health,
/// total count) is published through watch channels for the presentation
/// layer to consume.
///
/// [`sync`]: Portal::sync
/// [`wave`]: Portal::wave
pub struct Portal {
    session: SessionConnector,
    reconciler: Reconciler,
    ledger: Arc<dyn Ledger>,
    total: watch::Sender<U256>,
}

impl Portal {
    /// Creates a portal over the ledger and an optional wallet capability.
    pub fn new(ledger: Arc<dyn Ledger>, wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        Self::with_config(ledger, wallet, ReconcilerConfig::default())
    }

    pub fn with_config(
        ledger: Arc<dyn Ledger>,
        wallet: Option<Arc<dyn WalletProvider>>,
        config: ReconcilerConfig,
    ) -> Self {
        let (total, _) = watch::channel(U256::ZERO);
        Self {
            session: SessionConnector::new(wallet),
            reconciler: Reconciler::with_config(Arc::clone(&ledger), config),
            ledger,
            total,
        }
    }

    /// Queries for an already-authorized identity without prompting.
    pub async fn detect_identity(&self) -> Result<Option<Address>, PortalError> {
        self.session.detect_identity().await
    }

    /// Prompts for authorization, publishes the identity and refreshes the
    /// total wave count.
    pub async fn connect(&self) -> Result<Address, PortalError> {
        let identity = self.session.request_connection().await?;
        if let Err(err) = self.refresh_total().await {
            warn!(%err, "total wave count refresh failed");
        }
        Ok(identity)
    }

    /// Bulk-fetches the history and opens the live feed.
    ///
    /// Requires a connected identity. The returned handle owns the feed;
    /// see [`Reconciler::subscribe`].
    pub async fn sync(&self) -> Result<Subscription, PortalError> {
        self.require_identity()?;
        self.reconciler.load_history().await?;
        Ok(self.reconciler.subscribe())
    }

    /// Submits a wave and waits for its confirmation.
    ///
    /// Requires a connected identity. On confirmation the total count is
    /// refreshed; the confirmed record reaches the collection through the
    /// reconciler, deduplicated against the live feed.
    pub async fn wave(&self, message: &str) -> Result<TxHash, PortalError> {
        self.require_identity()?;
        let tx_hash = self.reconciler.submit(message).await?;
        if let Err(err) = self.refresh_total().await {
            warn!(%err, "total wave count refresh failed");
        }
        Ok(tx_hash)
    }

    /// Re-reads the total wave count from the ledger and publishes it.
    pub async fn refresh_total(&self) -> Result<U256, PortalError> {
        let total = self.ledger.total_waves().await.map_err(PortalError::FetchFailed)?;
        self.total.send_if_modified(|current| {
            let changed = *current != total;
            *current = total;
            changed
        });
        Ok(total)
    }

    fn require_identity(&self) -> Result<Address, PortalError> {
        self.session.current_identity().ok_or(PortalError::NotConnected)
    }

    /// The currently connected identity, if any.
    pub fn identity(&self) -> Option<Address> {
        self.session.current_identity()
    }

    pub fn identity_watch(&self) -> watch::Receiver<Option<Address>> {
        self.session.identity_watch()
    }

    /// Snapshot of the merged collection.
    pub fn waves(&self) -> WaveCollection {
        self.reconciler.waves()
    }

    pub fn waves_watch(&self) -> watch::Receiver<WaveCollection> {
        self.reconciler.waves_watch()
    }

    pub fn action_state(&self) -> ActionState {
        self.reconciler.action_state()
    }

    pub fn action_watch(&self) -> watch::Receiver<ActionState> {
        self.reconciler.action_watch()
    }

    pub fn feed_status(&self) -> FeedStatus {
        self.reconciler.feed_status()
    }

    pub fn feed_watch(&self) -> watch::Receiver<FeedStatus> {
        self.reconciler.feed_watch()
    }

    /// Last published total wave count.
    pub fn total(&self) -> U256 {
        *self.total.borrow()
    }

    pub fn total_watch(&self) -> watch::Receiver<U256> {
        self.total.subscribe()
    }

    pub fn session(&self) -> &SessionConnector {
        &self.session
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}
