//! Request/response transfer engine
//!
//! Drives one framed exchange at a time against an open device session: the
//! caller submits a request with [`TransferEngine::send_request`] and blocks
//! in [`TransferEngine::wait`] until the worker thread has run both the write
//! and the chained read. Completion-time failures are carried through the
//! [`ExchangeResult`] rather than raised, since they occur on the worker
//! thread and have to cross back to the caller.
//!
//! Exactly one exchange may be in flight per engine; a second `send_request`
//! before the previous exchange completed is rejected with
//! [`EngineError::ExchangeInFlight`].

use crate::error::EngineError;
use crate::usb::queue::TransferSubmitter;
use crate::usb::supervisor::UsbSession;
use crate::usb::transfers::{Completion, DeviceIo, TransferJob, TransferOp, TransferStatus};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Which transfer of the exchange produced the final status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    Write,
    Read,
}

/// Outcome of one request/response round trip
#[derive(Debug, Clone)]
pub struct ExchangeResult {
    /// Status of the transfer that ended the exchange
    pub status: TransferStatus,
    /// Stage that produced the status
    pub stage: ExchangeStage,
    /// Raw response bytes; empty unless the read completed
    pub data: Vec<u8>,
    /// Time from submission to completion
    pub elapsed: Duration,
}

impl ExchangeResult {
    pub fn is_success(&self) -> bool {
        self.status == TransferStatus::Completed
    }

    fn failed(stage: ExchangeStage, status: TransferStatus, started: Instant) -> Self {
        Self {
            status,
            stage,
            data: Vec::new(),
            elapsed: started.elapsed(),
        }
    }
}

/// Per-exchange state machine
///
/// `Idle -> OutSubmitted -> InSubmitted -> Ready`; every failure path also
/// terminates in `Ready` so the waiter is always woken. `Ready` holds the
/// result until `wait` consumes it or a new request re-arms the exchange.
enum ExchangeState {
    Idle,
    OutSubmitted { started: Instant },
    InSubmitted { started: Instant },
    Ready(ExchangeResult),
}

struct ExchangeShared {
    state: Mutex<ExchangeState>,
    ready: Condvar,
}

impl ExchangeShared {
    fn lock(&self) -> MutexGuard<'_, ExchangeState> {
        // A poisoned lock only means a continuation panicked mid-update; the
        // state value itself stays coherent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, result: ExchangeResult) {
        let mut state = self.lock();
        *state = ExchangeState::Ready(result);
        self.ready.notify_one();
    }
}

/// Blocking request/response engine bound to one device session
pub struct TransferEngine {
    io: Arc<dyn DeviceIo>,
    submitter: TransferSubmitter,
    shared: Arc<ExchangeShared>,
    timeout: Duration,
    read_len: usize,
}

impl TransferEngine {
    pub(crate) fn new(
        session: &UsbSession,
        timeout: Duration,
        read_len: usize,
    ) -> Self {
        Self {
            io: session.io(),
            submitter: session.submitter(),
            shared: Arc::new(ExchangeShared {
                state: Mutex::new(ExchangeState::Idle),
                ready: Condvar::new(),
            }),
            timeout,
            read_len,
        }
    }

    /// Encode and submit one request frame
    ///
    /// Returns without submitting anything when encoding fails or an exchange
    /// is already in flight. A successful return arms the exchange; the
    /// response is collected with [`wait`](Self::wait).
    pub fn send_request(&self, command: u16, payload: &[u8]) -> Result<(), EngineError> {
        let frame = protocol::encode_frame(command, payload)?;
        let started = Instant::now();
        debug!(
            "sending command {:#06x}, {} frame bytes",
            command,
            frame.len()
        );

        let shared = Arc::clone(&self.shared);
        let submitter = self.submitter.clone();
        let io = Arc::clone(&self.io);
        let read_len = self.read_len;
        let timeout = self.timeout;
        let job = TransferJob {
            io: Arc::clone(&self.io),
            op: TransferOp::BulkOut { data: frame },
            timeout,
            complete: Box::new(move |completion| {
                write_complete(shared, submitter, io, read_len, timeout, started, completion);
            }),
        };

        // Check and arm in one critical section so racing senders cannot
        // both pass the in-flight check; arming before submitting also means
        // the completion can never observe an idle state.
        {
            let mut state = self.shared.lock();
            match &*state {
                ExchangeState::OutSubmitted { .. } | ExchangeState::InSubmitted { .. } => {
                    return Err(EngineError::ExchangeInFlight);
                }
                // An unconsumed result is discarded when a new request arms
                // the exchange.
                ExchangeState::Idle | ExchangeState::Ready(_) => {}
            }
            *state = ExchangeState::OutSubmitted { started };
        }

        if self.submitter.submit(job).is_err() {
            *self.shared.lock() = ExchangeState::Idle;
            return Err(EngineError::SubmissionFailed);
        }
        Ok(())
    }

    /// Block until the in-flight exchange completes and take its result
    ///
    /// The engine is re-armable: after `wait` returns, the next
    /// `send_request`/`wait` pair blocks for its own completion. Calling
    /// `wait` with no exchange armed is an error rather than a hang.
    pub fn wait(&self) -> Result<ExchangeResult, EngineError> {
        let mut state = self.shared.lock();
        loop {
            match std::mem::replace(&mut *state, ExchangeState::Idle) {
                ExchangeState::Ready(result) => return Ok(result),
                ExchangeState::Idle => return Err(EngineError::NoExchangeInFlight),
                pending => {
                    *state = pending;
                    state = self
                        .shared
                        .ready
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

/// Write-completion continuation, runs on the worker thread
///
/// On success chains the bulk read; on any other status finishes the exchange
/// so the waiter is woken instead of left blocked.
fn write_complete(
    shared: Arc<ExchangeShared>,
    submitter: TransferSubmitter,
    io: Arc<dyn DeviceIo>,
    read_len: usize,
    timeout: Duration,
    started: Instant,
    completion: Completion,
) {
    if completion.status != TransferStatus::Completed {
        warn!("out transfer failed: {}", completion.status);
        shared.finish(ExchangeResult::failed(
            ExchangeStage::Write,
            completion.status,
            started,
        ));
        return;
    }

    debug!("out transfer completed, {} bytes sent", completion.transferred);

    let read_shared = Arc::clone(&shared);
    let job = TransferJob {
        io,
        op: TransferOp::BulkIn { len: read_len },
        timeout,
        complete: Box::new(move |c| read_complete(read_shared, started, c)),
    };

    *shared.lock() = ExchangeState::InSubmitted { started };

    if submitter.submit(job).is_err() {
        shared.finish(ExchangeResult::failed(
            ExchangeStage::Read,
            TransferStatus::Cancelled,
            started,
        ));
    }
}

/// Read-completion continuation, runs on the worker thread
///
/// Marks the exchange ready and wakes the waiter regardless of status.
fn read_complete(shared: Arc<ExchangeShared>, started: Instant, completion: Completion) {
    let elapsed = started.elapsed();
    debug!(
        "in transfer {} after {:?}, {} bytes",
        completion.status, elapsed, completion.transferred
    );
    shared.finish(ExchangeResult {
        status: completion.status,
        stage: ExchangeStage::Read,
        data: completion.data,
        elapsed,
    });
}
