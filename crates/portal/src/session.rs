use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{error::PortalError, wallet::WalletProvider};

/// Owns the optional wallet capability and publishes the connected identity.
///
/// The identity slot is single-valued: set by [`detect_identity`] or
/// [`request_connection`], observed by everyone else through the watch
/// channel. Nothing in the core clears it; teardown belongs to the session
/// host.
///
/// [`detect_identity`]: SessionConnector::detect_identity
/// [`request_connection`]: SessionConnector::request_connection
pub struct SessionConnector {
    wallet: Option<Arc<dyn WalletProvider>>,
    identity: watch::Sender<Option<Address>>,
}

impl SessionConnector {
    /// Creates a connector over an optional wallet capability, resolved once
    /// by the caller at startup.
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        let (identity, _) = watch::channel(None);
        Self { wallet, identity }
    }

    /// Whether a wallet capability was injected.
    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    /// Queries for an already-authorized identity without prompting.
    ///
    /// Returns `Ok(None)` when no wallet capability is present or nothing is
    /// authorized yet. On success the identity is published before
    /// returning.
    pub async fn detect_identity(&self) -> Result<Option<Address>, PortalError> {
        let Some(wallet) = &self.wallet else {
            debug!("no wallet capability; skipping identity detection");
            return Ok(None);
        };

        let identities = wallet.authorized_identities().await.map_err(PortalError::from)?;
        let Some(identity) = identities.first().copied() else {
            debug!("no authorized identity found");
            return Ok(None);
        };

        debug!(%identity, "found an authorized identity");
        self.identity.send_replace(Some(identity));
        Ok(Some(identity))
    }

    /// Prompts the user for authorization and publishes the result.
    ///
    /// Fails with [`PortalError::WalletUnavailable`] when no wallet
    /// capability is present and [`PortalError::UserRejected`] when the user
    /// declines; the identity slot is left untouched in both cases.
    pub async fn request_connection(&self) -> Result<Address, PortalError> {
        let wallet = self.wallet.as_ref().ok_or(PortalError::WalletUnavailable)?;
        let identity = wallet.request_authorization().await.map_err(PortalError::from)?;

        debug!(%identity, "identity connected");
        self.identity.send_replace(Some(identity));
        Ok(identity)
    }

    /// The currently connected identity, if any.
    pub fn current_identity(&self) -> Option<Address> {
        *self.identity.borrow()
    }

    /// Watches the identity slot.
    pub fn identity_watch(&self) -> watch::Receiver<Option<Address>> {
        self.identity.subscribe()
    }
}
