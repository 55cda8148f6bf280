use alloy_network::Ethereum;
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, PendingTransactionError, Provider, WatchTxError};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

use waveportal::{Ledger, LedgerError, WaveHandle, WaveRecord, WaveStream};

use crate::bindings::WavePortal::{self, NewWave, WavePortalInstance};

/// Tuning for the on-chain adapter.
#[derive(Clone, Debug)]
pub struct AlloyLedgerConfig {
    /// Confirmations to wait for before a wave counts as confirmed.
    pub confirmations: u64,
    /// Cap on the provider-side receipt watch. The reconciler applies its
    /// own confirmation timeout on top, so `None` is fine.
    pub timeout: Option<Duration>,
    /// Gas limit override for `wave` submissions.
    pub gas_limit: Option<u64>,
}

impl Default for AlloyLedgerConfig {
    fn default() -> Self {
        Self { confirmations: 1, timeout: None, gas_limit: None }
    }
}

/// [`Ledger`] over a deployed WavePortal contract.
pub struct AlloyLedger<P> {
    contract: WavePortalInstance<P>,
    config: AlloyLedgerConfig,
}

impl<P: Provider> AlloyLedger<P> {
    /// Binds the adapter to the contract deployed at `address`.
    pub fn new(address: Address, provider: P) -> Self {
        Self::with_config(address, provider, AlloyLedgerConfig::default())
    }

    pub fn with_config(address: Address, provider: P, config: AlloyLedgerConfig) -> Self {
        Self { contract: WavePortal::new(address, provider), config }
    }

    /// Address of the bound contract.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

#[async_trait]
impl<P: Provider + 'static> Ledger for AlloyLedger<P> {
    async fn wave(&self, message: &str) -> Result<Box<dyn WaveHandle>, LedgerError> {
        let mut call = self.contract.wave(message.to_string());
        if let Some(gas) = self.config.gas_limit {
            call = call.gas(gas);
        }

        // Failures up to here never made it into the mempool: signing was
        // declined, the node refused the transaction, or gas estimation
        // reverted.
        let pending = call
            .send()
            .await
            .map_err(|err| LedgerError::Rejected(err.to_string()))?
            .with_required_confirmations(self.config.confirmations)
            .with_timeout(self.config.timeout);
        debug!(tx_hash = %pending.tx_hash(), "wave transaction sent");

        Ok(Box::new(PendingWave { pending }))
    }

    async fn total_waves(&self) -> Result<U256, LedgerError> {
        self.contract
            .getTotalWaves()
            .call()
            .await
            .map_err(|err| LedgerError::Query(err.to_string()))
    }

    async fn all_waves(&self) -> Result<Vec<WaveRecord>, LedgerError> {
        let waves = self
            .contract
            .getAllWaves()
            .call()
            .await
            .map_err(|err| LedgerError::Query(err.to_string()))?;
        Ok(waves.into_iter().map(record_from_wave).collect())
    }

    async fn wave_stream(&self) -> Result<WaveStream, LedgerError> {
        let poller = self
            .contract
            .NewWave_filter()
            .watch()
            .await
            .map_err(|err| LedgerError::Stream(err.to_string()))?;
        debug!(address = %self.contract.address(), "watching for new waves");

        let stream = poller.into_stream().map(|item| match item {
            Ok((event, _)) => Ok(record_from_event(event)),
            Err(err) => Err(LedgerError::Stream(err.to_string())),
        });
        Ok(stream.boxed())
    }
}

fn record_from_wave(wave: WavePortal::Wave) -> WaveRecord {
    WaveRecord::new(wave.waver, wave.timestamp.saturating_to::<u64>(), wave.message)
}

fn record_from_event(event: NewWave) -> WaveRecord {
    WaveRecord::new(event.from, event.timestamp.saturating_to::<u64>(), event.message)
}

/// In-flight `wave` transaction backed by the provider's receipt watcher.
struct PendingWave {
    pending: PendingTransactionBuilder<Ethereum>,
}

#[async_trait]
impl WaveHandle for PendingWave {
    fn tx_hash(&self) -> TxHash {
        *self.pending.tx_hash()
    }

    async fn confirmed(self: Box<Self>) -> Result<Option<WaveRecord>, LedgerError> {
        let tx_hash = *self.pending.tx_hash();
        let receipt = self.pending.get_receipt().await.map_err(|err| match err {
            PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                LedgerError::Dropped { tx_hash }
            }
            err => LedgerError::Confirmation { tx_hash, reason: err.to_string() },
        })?;

        if !receipt.status() {
            return Err(LedgerError::Reverted { tx_hash });
        }

        // The receipt already carries the event, so hand the record back
        // instead of waiting for the live feed to deliver the same thing.
        let record = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| log.log_decode::<NewWave>().ok())
            .map(|log| record_from_event(log.inner.data));
        Ok(record)
    }
}
