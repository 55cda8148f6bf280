use alloy_primitives::TxHash;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{oneshot, watch, Mutex},
    task::JoinHandle,
    time,
};

use crate::{
    collection::WaveCollection,
    error::{LedgerError, PortalError},
    ledger::Ledger,
    types::{ActionFailure, ActionState, FeedStatus, WaveRecord},
};
use futures::StreamExt;

/// Tuning knobs for the reconciler.
#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Cap on the confirmation wait for a submitted wave.
    pub confirmation_timeout: Duration,
    /// Base delay before the first reopen attempt; doubles per attempt.
    pub resubscribe_backoff: Duration,
    /// Ceiling for the backoff delay.
    pub max_backoff: Duration,
    /// Number of consecutive feed failures after which the feed is
    /// declared lost. A stream that dies after going live counts as one.
    pub max_resubscribe_attempts: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(90),
            resubscribe_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_resubscribe_attempts: 5,
        }
    }
}

impl ReconcilerConfig {
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.resubscribe_backoff.saturating_mul(1 << exp).min(self.max_backoff)
    }
}

/// Reconciles wave submissions and the live event feed into one
/// duplicate-free collection.
///
/// A confirmed wave can reach the client three ways: decoded from its own
/// receipt, delivered by the live feed, or returned by a bulk refetch. All
/// three paths funnel into the same [`WaveCollection`], published through a
/// watch channel whose sender serializes every mutation, so a record lands
/// exactly once no matter how many paths observe it.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
}

struct ReconcilerInner {
    ledger: Arc<dyn Ledger>,
    config: ReconcilerConfig,
    waves: watch::Sender<WaveCollection>,
    action: watch::Sender<ActionState>,
    feed: watch::Sender<FeedStatus>,
    submit_gate: Mutex<()>,
}

impl Reconciler {
    /// Creates a reconciler over the ledger collaborator.
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self::with_config(ledger, ReconcilerConfig::default())
    }

    pub fn with_config(ledger: Arc<dyn Ledger>, config: ReconcilerConfig) -> Self {
        let (waves, _) = watch::channel(WaveCollection::new());
        let (action, _) = watch::channel(ActionState::Idle);
        let (feed, _) = watch::channel(FeedStatus::Idle);
        Self {
            inner: Arc::new(ReconcilerInner {
                ledger,
                config,
                waves,
                action,
                feed,
                submit_gate: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.inner.config
    }

    /// Submits one wave and drives it to a terminal state.
    ///
    /// The `Submitted -> Pending -> {Confirmed, Failed}` lifecycle is
    /// published through [`action_watch`]; the returned result mirrors the
    /// terminal state. While one wave is in flight any further `submit`
    /// fails fast with [`PortalError::ActionInProgress`] and leaves the
    /// in-flight action undisturbed: submissions are rejected, never
    /// queued.
    ///
    /// A record decoded from the confirmation receipt is merged into the
    /// collection; the same wave arriving again through the live feed or a
    /// refetch is deduplicated.
    ///
    /// [`action_watch`]: Reconciler::action_watch
    pub async fn submit(&self, message: &str) -> Result<TxHash, PortalError> {
        let inner = &self.inner;
        let _gate = inner.submit_gate.try_lock().map_err(|_| PortalError::ActionInProgress)?;

        inner.action.send_replace(ActionState::Submitted);
        debug!(message_len = message.len(), "submitting wave");

        let handle = match inner.ledger.wave(message).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(%err, "wave rejected before a handle was produced");
                inner.action.send_replace(ActionState::Failed {
                    tx_hash: None,
                    failure: ActionFailure::Rejected,
                });
                return Err(PortalError::SubmissionRejected(err.to_string()));
            }
        };

        let tx_hash = handle.tx_hash();
        inner.action.send_replace(ActionState::Pending { tx_hash });
        debug!(%tx_hash, "wave pending");

        match time::timeout(inner.config.confirmation_timeout, handle.confirmed()).await {
            Ok(Ok(record)) => {
                inner.action.send_replace(ActionState::Confirmed { tx_hash });
                debug!(%tx_hash, "wave confirmed");
                if let Some(record) = record {
                    inner.insert(record);
                }
                Ok(tx_hash)
            }
            Ok(Err(err)) => {
                warn!(%tx_hash, %err, "wave failed to confirm");
                let failure = match &err {
                    LedgerError::Reverted { .. } => ActionFailure::Reverted,
                    // Anything else left the wave unobservable.
                    _ => ActionFailure::Dropped,
                };
                inner.action.send_replace(ActionState::Failed { tx_hash: Some(tx_hash), failure });
                Err(PortalError::ConfirmationFailed(err))
            }
            Err(_) => {
                let timeout = inner.config.confirmation_timeout;
                warn!(%tx_hash, ?timeout, "wave confirmation timed out");
                inner.action.send_replace(ActionState::Failed {
                    tx_hash: Some(tx_hash),
                    failure: ActionFailure::TimedOut,
                });
                Err(PortalError::ConfirmationTimeout { tx_hash, timeout })
            }
        }
    }

    /// Fetches the full history once and merges it into the collection.
    ///
    /// Safe to call again at any time: existing entries keep their position
    /// and only unseen records append, in ledger order. Returns the number
    /// of records inserted.
    pub async fn load_history(&self) -> Result<usize, PortalError> {
        self.inner.fetch_and_merge().await.map_err(PortalError::FetchFailed)
    }

    /// Opens the live feed.
    ///
    /// The feed runs on its own task: it opens the ledger's event stream
    /// and appends each unseen event to the collection. Each successful
    /// open backfills through a bulk refetch before going live, so waves
    /// mined while no stream was up (including before the first open) are
    /// never lost; on any stream failure the task reopens with exponential
    /// backoff. Feed health is published through [`feed_watch`]; exhausted
    /// retries surface as [`FeedStatus::Lost`] and stop the task.
    ///
    /// One feed is meant to be open at a time: every call spawns its own
    /// drive task and all tasks publish to the same status channel, so
    /// unsubscribe before resubscribing.
    ///
    /// The returned handle owns the feed. Dropping it also releases the
    /// subscription, but only [`Subscription::unsubscribe`] guarantees the
    /// task is gone by the time it returns.
    ///
    /// [`feed_watch`]: Reconciler::feed_watch
    pub fn subscribe(&self) -> Subscription {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(drive(Arc::clone(&self.inner), cancel_rx));
        Subscription { cancel: Some(cancel_tx), task: Some(task) }
    }

    /// Snapshot of the merged collection.
    pub fn waves(&self) -> WaveCollection {
        self.inner.waves.borrow().clone()
    }

    /// Watches the merged collection. Observers are only notified when a
    /// mutation actually inserted a record.
    pub fn waves_watch(&self) -> watch::Receiver<WaveCollection> {
        self.inner.waves.subscribe()
    }

    /// State of the current (or last) wave action.
    pub fn action_state(&self) -> ActionState {
        self.inner.action.borrow().clone()
    }

    pub fn action_watch(&self) -> watch::Receiver<ActionState> {
        self.inner.action.subscribe()
    }

    /// Health of the live feed.
    pub fn feed_status(&self) -> FeedStatus {
        self.inner.feed.borrow().clone()
    }

    pub fn feed_watch(&self) -> watch::Receiver<FeedStatus> {
        self.inner.feed.subscribe()
    }
}

impl ReconcilerInner {
    /// Single entry point for all collection mutations; the watch sender
    /// serializes concurrent attempts and notifies only on insertion.
    fn insert(&self, record: WaveRecord) -> bool {
        let waver = record.waver;
        let inserted = self.waves.send_if_modified(|waves| waves.insert(record));
        if inserted {
            debug!(%waver, "wave recorded");
        } else {
            trace!(%waver, "duplicate wave ignored");
        }
        inserted
    }

    async fn fetch_and_merge(&self) -> Result<usize, LedgerError> {
        let history = self.ledger.all_waves().await?;
        let fetched = history.len();
        let mut inserted = 0;
        self.waves.send_if_modified(|waves| {
            inserted = waves.merge(history);
            inserted > 0
        });
        debug!(fetched, inserted, "history merged");
        Ok(inserted)
    }
}

/// Owning handle to a live feed opened by [`Reconciler::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Whether the drive task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the feed. Idempotent.
    ///
    /// Waits for the drive task to exit, so once this returns no event from
    /// this subscription can mutate the collection anymore.
    pub async fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if err.is_panic() {
                    error!(%err, "subscription drive task panicked");
                }
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The drive task selects on cancellation before every stream item,
        // so signalling is enough; it winds down on its own.
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

async fn drive(inner: Arc<ReconcilerInner>, mut cancel: oneshot::Receiver<()>) {
    // Consecutive feed failures; 0 means the upcoming open is the first.
    let mut attempt = 0u32;

    'feed: loop {
        if attempt == 0 {
            inner.feed.send_replace(FeedStatus::Connecting);
        } else {
            let delay = inner.config.backoff_delay(attempt);
            debug!(attempt, ?delay, "backing off before reopening the wave stream");
            inner.feed.send_replace(FeedStatus::Reconnecting { attempt });
            tokio::select! {
                biased;
                _ = &mut cancel => break 'feed,
                _ = time::sleep(delay) => {}
            }
        }

        let opened = tokio::select! {
            biased;
            _ = &mut cancel => break 'feed,
            opened = inner.ledger.wave_stream() => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                attempt += 1;
                if attempt >= inner.config.max_resubscribe_attempts {
                    error!(%err, attempt, "wave stream retries exhausted");
                    inner.feed.send_replace(FeedStatus::Lost { reason: err.to_string() });
                    return;
                }
                warn!(%err, attempt, "failed to open the wave stream");
                continue;
            }
        };

        // Anything mined while no stream was up only shows in the history;
        // dedup makes the overlap with live events safe.
        match inner.fetch_and_merge().await {
            Ok(inserted) => debug!(inserted, "backfilled on open"),
            Err(err) => warn!(%err, "backfill on open failed"),
        }

        debug!("wave stream live");
        inner.feed.send_replace(FeedStatus::Live);

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut cancel => break 'feed,
                event = stream.next() => event,
            };
            match event {
                Some(Ok(record)) => {
                    inner.insert(record);
                }
                Some(Err(err)) => {
                    warn!(%err, "wave stream error");
                    attempt = 1;
                    break;
                }
                None => {
                    warn!("wave stream ended");
                    attempt = 1;
                    break;
                }
            }
        }
    }

    inner.feed.send_replace(FeedStatus::Idle);
}
