//! # WavePortal Client Core
//!
//! Client-side transaction and event reconciliation for the WavePortal
//! contract: submit a wave (optionally carrying a short message), track its
//! `Submitted -> Pending -> {Confirmed, Failed}` lifecycle, and keep a
//! locally cached view of the on-chain wave history consistent with a live
//! event feed.
//!
//! ## Architecture
//!
//! Two pieces collaborate around a shared, watch-published state:
//!
//! 1. [`SessionConnector`] resolves the optional wallet capability once and
//!    publishes the connected identity.
//! 2. [`Reconciler`] issues the state-changing call, bulk-fetches history
//!    and merges the live feed into one [`WaveCollection`] with
//!    at-most-once semantics per record, keyed by
//!    `(waver, timestamp, message)`.
//!
//! [`Portal`] composes both and enforces the session control flow:
//! identity first, then history fetch, then live feed, then submissions.
//!
//! The external collaborators are trait seams: [`WalletProvider`] for the
//! signing identity and [`Ledger`] for the contract. The `waveportal-alloy`
//! crate provides the production ledger adapter; scriptable in-memory
//! implementations live in `waveportal-test-utils`.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod collection;
pub mod error;
pub mod ledger;
pub mod portal;
pub mod reconciler;
pub mod session;
pub mod types;
pub mod wallet;

pub use collection::WaveCollection;
pub use error::{LedgerError, PortalError, WalletError};
pub use ledger::{Ledger, WaveHandle, WaveStream};
pub use portal::Portal;
pub use reconciler::{Reconciler, ReconcilerConfig, Subscription};
pub use session::SessionConnector;
pub use types::{ActionFailure, ActionState, FeedStatus, WaveKey, WaveRecord};
pub use wallet::WalletProvider;
