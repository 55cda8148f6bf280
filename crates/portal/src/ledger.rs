use alloy_primitives::{TxHash, U256};
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{error::LedgerError, types::WaveRecord};

/// Stream of live wave events as the ledger reports them.
///
/// An `Err` item or the end of the stream means the feed is gone; the
/// reconciler reopens through [`Ledger::wave_stream`] rather than polling a
/// broken stream further.
pub type WaveStream = BoxStream<'static, Result<WaveRecord, LedgerError>>;

/// Handle to an in-flight wave transaction.
#[async_trait]
pub trait WaveHandle: Send {
    /// Hash of the submitted transaction.
    fn tx_hash(&self) -> TxHash;

    /// Waits until the transaction is confirmed.
    ///
    /// Resolves to the record the ledger decoded from the receipt, when it
    /// exposes one. `Ok(None)` still counts as confirmed; the record then
    /// arrives through the live feed or a refetch instead.
    async fn confirmed(self: Box<Self>) -> Result<Option<WaveRecord>, LedgerError>;
}

/// The on-chain collaborator.
///
/// Everything the portal knows about the chain goes through this seam:
/// submitting a wave, reading the recorded history and total, and watching
/// for new events. Implementations own their contract instance; callers
/// never construct or address the contract themselves.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submits a wave carrying `message`. An empty message is allowed.
    async fn wave(&self, message: &str) -> Result<Box<dyn WaveHandle>, LedgerError>;

    /// Total number of waves recorded by the contract.
    async fn total_waves(&self) -> Result<U256, LedgerError>;

    /// Every recorded wave, in ledger order.
    async fn all_waves(&self) -> Result<Vec<WaveRecord>, LedgerError>;

    /// Opens a stream of new wave events.
    async fn wave_stream(&self) -> Result<WaveStream, LedgerError>;
}
