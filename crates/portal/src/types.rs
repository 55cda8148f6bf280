use alloy_primitives::{keccak256, Address, TxHash, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PortalError;

/// One confirmed wave as recorded by the portal contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveRecord {
    /// Address that sent the wave.
    pub waver: Address,
    /// Block timestamp of the wave.
    pub timestamp: DateTime<Utc>,
    /// Message carried with the wave. May be empty.
    pub message: String,
}

impl WaveRecord {
    /// Builds a record from the ledger's wire representation. The ledger
    /// reports timestamps as wall-clock seconds since epoch.
    pub fn new(waver: Address, timestamp_secs: u64, message: impl Into<String>) -> Self {
        let timestamp = DateTime::from_timestamp(timestamp_secs as i64, 0).unwrap_or_default();
        Self { waver, timestamp, message: message.into() }
    }

    /// The dedup key identifying this record across arrival paths.
    pub fn key(&self) -> WaveKey {
        WaveKey {
            waver: self.waver,
            timestamp_secs: self.timestamp.timestamp(),
            message_hash: keccak256(self.message.as_bytes()),
        }
    }
}

/// Identity of a record for dedup purposes.
///
/// The contract stores no record id, so the only data shared by every
/// arrival path (bulk fetch, live event, receipt log) is the record triple
/// itself. The message is keyed by its keccak hash to keep the key
/// fixed-size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveKey {
    waver: Address,
    timestamp_secs: i64,
    message_hash: B256,
}

/// Lifecycle of a single wave submission.
///
/// Reachable transitions are exactly
/// `Idle -> Submitted -> Pending -> {Confirmed, Failed}`, except that a
/// submission rejected before a handle exists goes `Submitted -> Failed`
/// directly. `Confirmed` and `Failed` are terminal for the action instance;
/// the next submission starts over from `Submitted`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActionState {
    /// No wave is in flight.
    #[default]
    Idle,
    /// The call has been handed to the ledger; no handle yet.
    Submitted,
    /// The ledger produced a handle; awaiting confirmation.
    Pending { tx_hash: TxHash },
    /// The wave was mined successfully.
    Confirmed { tx_hash: TxHash },
    /// The wave did not make it on chain.
    Failed { tx_hash: Option<TxHash>, failure: ActionFailure },
}

impl ActionState {
    /// Whether this state ends the action instance.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed { .. })
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Submitted => f.write_str("submitted"),
            Self::Pending { tx_hash } => write!(f, "pending ({tx_hash})"),
            Self::Confirmed { tx_hash } => write!(f, "confirmed ({tx_hash})"),
            Self::Failed { tx_hash: Some(tx_hash), failure } => {
                write!(f, "failed: {failure} ({tx_hash})")
            }
            Self::Failed { tx_hash: None, failure } => write!(f, "failed: {failure}"),
        }
    }
}

/// Why a wave submission failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFailure {
    /// Rejected before a transaction handle was produced.
    Rejected,
    /// Mined but reverted.
    Reverted,
    /// The confirmation wait exceeded the configured cap.
    TimedOut,
    /// Dropped or unobservable before confirmation.
    Dropped,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => f.write_str("rejected"),
            Self::Reverted => f.write_str("reverted"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Dropped => f.write_str("dropped"),
        }
    }
}

/// Health of the live event feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No subscription is open.
    #[default]
    Idle,
    /// First open in progress.
    Connecting,
    /// Receiving live events.
    Live,
    /// The feed dropped; reopening with backoff.
    Reconnecting { attempt: u32 },
    /// Reopen attempts are exhausted; the feed stays down.
    Lost { reason: String },
}

impl FeedStatus {
    /// The terminal error once the feed has been declared lost.
    pub fn error(&self) -> Option<PortalError> {
        match self {
            Self::Lost { reason } => Some(PortalError::SubscriptionError(reason.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Live => f.write_str("live"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Lost { reason } => write!(f, "lost: {reason}"),
        }
    }
}
