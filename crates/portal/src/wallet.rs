use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::WalletError;

/// The signing-identity collaborator.
///
/// Mirrors the EIP-1193 split between `eth_accounts` (silent) and
/// `eth_requestAccounts` (prompts the user). The portal receives this as an
/// optional capability resolved once at startup; absence of a wallet is a
/// normal condition, not an error, until the user asks to connect.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Identities the user has already authorized. Must not prompt.
    async fn authorized_identities(&self) -> Result<Vec<Address>, WalletError>;

    /// Prompts the user to authorize an identity.
    async fn request_authorization(&self) -> Result<Address, WalletError>;
}
