use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use waveportal::{WalletError, WalletProvider};

/// Scriptable in-memory wallet collaborator.
#[derive(Clone, Default)]
pub struct MockWallet {
    inner: Arc<Mutex<MockWalletInner>>,
}

#[derive(Default)]
struct MockWalletInner {
    authorized: Vec<Address>,
    grant: Option<Address>,
}

impl MockWallet {
    /// A wallet with `identity` already authorized; prompts re-grant it.
    pub fn authorized(identity: Address) -> Self {
        let wallet = Self::default();
        {
            let mut inner = wallet.inner.lock();
            inner.authorized.push(identity);
            inner.grant = Some(identity);
        }
        wallet
    }

    /// A wallet with nothing authorized that grants `identity` on prompt.
    pub fn granting(identity: Address) -> Self {
        let wallet = Self::default();
        wallet.inner.lock().grant = Some(identity);
        wallet
    }

    /// A wallet with nothing authorized whose prompts are declined.
    pub fn rejecting() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn authorized_identities(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.inner.lock().authorized.clone())
    }

    async fn request_authorization(&self) -> Result<Address, WalletError> {
        let mut inner = self.inner.lock();
        let identity = inner.grant.ok_or(WalletError::UserRejected)?;
        if !inner.authorized.contains(&identity) {
            inner.authorized.push(identity);
        }
        debug!(%identity, "mock wallet granted authorization");
        Ok(identity)
    }
}
