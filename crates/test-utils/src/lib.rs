//! Scriptable in-memory collaborators for exercising the waveportal core.
//!
//! [`MockWallet`] scripts the outcome of identity prompts. [`MockLedger`]
//! scripts submissions, the history, and the live feed, with failure
//! injection for each. A confirmed wave takes every arrival path at once
//! (receipt, live feed, later fetches), the same as the production
//! adapter, so deduplication gets exercised for free.

#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

mod ledger;
mod wallet;

pub use ledger::{MockLedger, WaveOutcome, WavePlan};
pub use wallet::MockWallet;

/// Initializes a tracing subscriber for tests, respecting `RUST_LOG`.
///
/// Repeated calls are no-ops, so every test can call it first thing.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
