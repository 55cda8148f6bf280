//! alloy-backed collaborators for the waveportal core.
//!
//! [`AlloyLedger`] implements [`waveportal::Ledger`] over a deployed
//! WavePortal contract: `wave` submissions go through the provider's wallet
//! filler and receipt watcher, reads go through plain calls, and the live
//! feed polls the contract's `NewWave` filter. [`LocalKeyWallet`] implements
//! [`waveportal::WalletProvider`] for a private key held locally, as used by
//! the `wave` CLI.

#[macro_use]
extern crate tracing;

pub mod bindings;
pub mod ledger;
pub mod wallet;

pub use ledger::{AlloyLedger, AlloyLedgerConfig};
pub use wallet::LocalKeyWallet;
