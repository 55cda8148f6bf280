use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use waveportal::{WalletError, WalletProvider};

/// [`WalletProvider`] over a local private key.
///
/// A key on disk needs no prompting: the identity is always authorized and
/// connection requests grant it immediately. Signing itself happens in the
/// provider's wallet filler, not here.
pub struct LocalKeyWallet {
    address: Address,
}

impl LocalKeyWallet {
    pub fn new(signer: &PrivateKeySigner) -> Self {
        Self { address: signer.address() }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    async fn authorized_identities(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.address])
    }

    async fn request_authorization(&self) -> Result<Address, WalletError> {
        Ok(self.address)
    }
}
