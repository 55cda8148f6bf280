use alloy_primitives::TxHash;
use std::time::Duration;

/// Errors produced by a wallet collaborator.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The user declined the prompt.
    #[error("user rejected the request")]
    UserRejected,
    /// The wallet backend failed.
    #[error("wallet backend error: {0}")]
    Backend(String),
}

/// Errors produced by a ledger collaborator.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The call was rejected before a transaction handle existed, e.g. the
    /// user declined to sign or the sender cannot cover the fee.
    #[error("rejected before submission: {0}")]
    Rejected(String),
    /// The transaction was mined but reverted.
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    /// The transaction left the mempool without being mined.
    #[error("transaction {tx_hash} dropped")]
    Dropped { tx_hash: TxHash },
    /// The confirmation wait failed for another reason.
    #[error("transaction {tx_hash} confirmation failed: {reason}")]
    Confirmation { tx_hash: TxHash, reason: String },
    /// A read query failed.
    #[error("ledger query failed: {0}")]
    Query(String),
    /// The live event stream failed.
    #[error("wave stream error: {0}")]
    Stream(String),
}

/// Portal-level error taxonomy.
///
/// Every failure also lands in the published state of the machine it
/// belongs to ([`ActionState::Failed`](crate::types::ActionState),
/// [`FeedStatus::Lost`](crate::types::FeedStatus), or an identity slot left
/// at `None`), so the presentation layer never has to catch anything to
/// stay consistent.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// No wallet collaborator was injected.
    #[error("no wallet is available")]
    WalletUnavailable,
    /// The user declined the authorization prompt.
    #[error("user rejected the request")]
    UserRejected,
    /// An operation that requires a connected identity ran before connect.
    #[error("no identity is connected")]
    NotConnected,
    /// A wave is already in flight; the new submission was not started.
    #[error("a wave is already in flight")]
    ActionInProgress,
    /// The ledger rejected the call before producing a transaction handle.
    #[error("wave submission rejected: {0}")]
    SubmissionRejected(String),
    /// The confirmation wait exceeded the configured cap.
    #[error("transaction {tx_hash} unconfirmed after {timeout:?}")]
    ConfirmationTimeout { tx_hash: TxHash, timeout: Duration },
    /// The transaction reached a terminal failure.
    #[error("wave confirmation failed")]
    ConfirmationFailed(#[source] LedgerError),
    /// The bulk history fetch failed.
    #[error("wave history fetch failed")]
    FetchFailed(#[source] LedgerError),
    /// The live feed failed beyond recovery.
    #[error("wave subscription lost: {0}")]
    SubscriptionError(String),
    /// Any other wallet-side failure.
    #[error(transparent)]
    Wallet(WalletError),
}

impl From<WalletError> for PortalError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected => Self::UserRejected,
            err => Self::Wallet(err),
        }
    }
}
