use alloy_primitives::{keccak256, Address, TxHash, U256};
use async_trait::async_trait;
use futures::{channel::mpsc, StreamExt};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::{oneshot, Notify};

use waveportal::{Ledger, LedgerError, WaveHandle, WaveRecord, WaveStream};

/// Planned behavior for an upcoming wave submission, FIFO.
#[derive(Clone, Copy, Debug)]
pub enum WavePlan {
    /// Confirm as soon as the handle is awaited.
    Confirm,
    /// Park the confirmation until [`MockLedger::release_next`].
    Hold,
    /// Revert once the handle is awaited.
    Revert,
    /// Vanish from the mempool once the handle is awaited.
    Drop,
    /// Refuse the submission before a handle exists.
    Reject,
}

/// Outcome handed to a held wave by [`MockLedger::release_next`].
#[derive(Clone, Copy, Debug)]
pub enum WaveOutcome {
    Confirmed,
    Reverted,
    Dropped,
}

/// Scriptable in-memory ledger collaborator.
///
/// A confirmed wave behaves like the chain: the record lands in the
/// history, fans out to every open stream, and comes back from the handle
/// as the receipt record, so a single submission exercises every arrival
/// path at once.
#[derive(Clone)]
pub struct MockLedger {
    inner: Arc<MockLedgerInner>,
}

struct MockLedgerInner {
    signer: Address,
    submission_gate: Notify,
    state: Mutex<LedgerState>,
}

struct LedgerState {
    records: Vec<WaveRecord>,
    subscribers: Vec<mpsc::UnboundedSender<Result<WaveRecord, LedgerError>>>,
    plans: VecDeque<WavePlan>,
    held: VecDeque<oneshot::Sender<WaveOutcome>>,
    gated_submissions: u32,
    fetch_failures: u32,
    subscribe_failures: u32,
    receipt_records: bool,
    clock: u64,
    nonce: u64,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            subscribers: Vec::new(),
            plans: VecDeque::new(),
            held: VecDeque::new(),
            gated_submissions: 0,
            fetch_failures: 0,
            subscribe_failures: 0,
            receipt_records: true,
            clock: 1_700_000_000,
            nonce: 0,
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::with_signer(Address::repeat_byte(0xAA))
    }

    /// A ledger whose submitted waves are attributed to `signer`.
    pub fn with_signer(signer: Address) -> Self {
        Self {
            inner: Arc::new(MockLedgerInner {
                signer,
                submission_gate: Notify::new(),
                state: Mutex::new(LedgerState::default()),
            }),
        }
    }

    pub fn signer(&self) -> Address {
        self.inner.signer
    }

    /// Seeds records into the history without touching open streams.
    pub fn push_history<I: IntoIterator<Item = WaveRecord>>(&self, records: I) {
        self.inner.state.lock().records.extend(records);
    }

    /// Emits a live event on every open stream.
    pub fn emit(&self, record: WaveRecord) {
        let mut state = self.inner.state.lock();
        MockLedgerInner::fan_out_record(&mut state, &record);
    }

    /// Emits a stream error on every open stream.
    pub fn emit_error(&self, reason: &str) {
        let mut state = self.inner.state.lock();
        MockLedgerInner::fan_out_error(&mut state, reason);
    }

    /// Ends every open stream.
    pub fn end_streams(&self) {
        self.inner.state.lock().subscribers.clear();
    }

    /// Number of streams still open.
    pub fn stream_count(&self) -> usize {
        let mut state = self.inner.state.lock();
        state.subscribers.retain(|sub| !sub.is_closed());
        state.subscribers.len()
    }

    /// Plans the behavior of the next unplanned submission; unplanned
    /// submissions confirm immediately.
    pub fn plan_wave(&self, plan: WavePlan) {
        self.inner.state.lock().plans.push_back(plan);
    }

    /// Releases the oldest held wave with `outcome`.
    ///
    /// Panics if no wave is held.
    pub fn release_next(&self, outcome: WaveOutcome) {
        let sender = self
            .inner
            .state
            .lock()
            .held
            .pop_front()
            .expect("no held wave to release");
        debug!(?outcome, "releasing held wave");
        // The waiter may already be gone if its confirmation timed out.
        let _ = sender.send(outcome);
    }

    /// Parks the next submission inside `wave` until
    /// [`release_submission`](Self::release_submission).
    pub fn gate_next_submission(&self) {
        self.inner.state.lock().gated_submissions += 1;
    }

    /// Releases one parked submission.
    pub fn release_submission(&self) {
        self.inner.submission_gate.notify_one();
    }

    /// Makes the next `n` history fetches fail.
    pub fn fail_next_fetches(&self, n: u32) {
        self.inner.state.lock().fetch_failures = n;
    }

    /// Makes the next `n` stream opens fail.
    pub fn fail_next_subscribes(&self, n: u32) {
        self.inner.state.lock().subscribe_failures = n;
    }

    /// Whether confirmation receipts carry the decoded record; on by
    /// default.
    pub fn set_receipt_records(&self, enabled: bool) {
        self.inner.state.lock().receipt_records = enabled;
    }

    /// Records currently on the ledger.
    pub fn records(&self) -> Vec<WaveRecord> {
        self.inner.state.lock().records.clone()
    }
}

impl MockLedgerInner {
    /// Mines a submitted wave: appends it to the history and fans it out
    /// to every open stream.
    fn mine(&self, message: String) -> (WaveRecord, bool) {
        let mut state = self.state.lock();
        state.clock += 1;
        let record = WaveRecord::new(self.signer, state.clock, message);
        debug!(waver = %record.waver, message = %record.message, "mock ledger mined wave");
        state.records.push(record.clone());
        Self::fan_out_record(&mut state, &record);
        (record, state.receipt_records)
    }

    fn fan_out_record(state: &mut LedgerState, record: &WaveRecord) {
        state.subscribers.retain(|sub| sub.unbounded_send(Ok(record.clone())).is_ok());
    }

    fn fan_out_error(state: &mut LedgerState, reason: &str) {
        state
            .subscribers
            .retain(|sub| sub.unbounded_send(Err(LedgerError::Stream(reason.to_string()))).is_ok());
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn wave(&self, message: &str) -> Result<Box<dyn WaveHandle>, LedgerError> {
        let gated = {
            let mut state = self.inner.state.lock();
            if state.gated_submissions > 0 {
                state.gated_submissions -= 1;
                true
            } else {
                false
            }
        };
        if gated {
            self.inner.submission_gate.notified().await;
        }

        let mut state = self.inner.state.lock();
        let plan = state.plans.pop_front().unwrap_or(WavePlan::Confirm);
        if matches!(plan, WavePlan::Reject) {
            return Err(LedgerError::Rejected("user declined to sign".to_string()));
        }

        state.nonce += 1;
        let tx_hash = TxHash::from(keccak256(state.nonce.to_be_bytes()));
        let mode = match plan {
            WavePlan::Confirm => ConfirmMode::Immediate(WaveOutcome::Confirmed),
            WavePlan::Revert => ConfirmMode::Immediate(WaveOutcome::Reverted),
            WavePlan::Drop => ConfirmMode::Immediate(WaveOutcome::Dropped),
            WavePlan::Hold => {
                let (release, released) = oneshot::channel();
                state.held.push_back(release);
                ConfirmMode::Held(released)
            }
            WavePlan::Reject => unreachable!("rejected above"),
        };

        Ok(Box::new(MockWaveHandle {
            ledger: self.inner.clone(),
            tx_hash,
            message: message.to_string(),
            mode,
        }))
    }

    async fn total_waves(&self) -> Result<U256, LedgerError> {
        Ok(U256::from(self.inner.state.lock().records.len()))
    }

    async fn all_waves(&self) -> Result<Vec<WaveRecord>, LedgerError> {
        let mut state = self.inner.state.lock();
        if state.fetch_failures > 0 {
            state.fetch_failures -= 1;
            return Err(LedgerError::Query("injected fetch failure".to_string()));
        }
        Ok(state.records.clone())
    }

    async fn wave_stream(&self) -> Result<WaveStream, LedgerError> {
        let mut state = self.inner.state.lock();
        if state.subscribe_failures > 0 {
            state.subscribe_failures -= 1;
            return Err(LedgerError::Stream("injected subscribe failure".to_string()));
        }
        let (events, stream) = mpsc::unbounded();
        state.subscribers.push(events);
        Ok(stream.boxed())
    }
}

enum ConfirmMode {
    Immediate(WaveOutcome),
    Held(oneshot::Receiver<WaveOutcome>),
}

struct MockWaveHandle {
    ledger: Arc<MockLedgerInner>,
    tx_hash: TxHash,
    message: String,
    mode: ConfirmMode,
}

#[async_trait]
impl WaveHandle for MockWaveHandle {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn confirmed(self: Box<Self>) -> Result<Option<WaveRecord>, LedgerError> {
        let Self { ledger, tx_hash, message, mode } = *self;
        let outcome = match mode {
            ConfirmMode::Immediate(outcome) => outcome,
            ConfirmMode::Held(released) => {
                released.await.map_err(|_| LedgerError::Dropped { tx_hash })?
            }
        };
        match outcome {
            WaveOutcome::Confirmed => {
                let (record, receipt_records) = ledger.mine(message);
                Ok(receipt_records.then_some(record))
            }
            WaveOutcome::Reverted => Err(LedgerError::Reverted { tx_hash }),
            WaveOutcome::Dropped => Err(LedgerError::Dropped { tx_hash }),
        }
    }
}
