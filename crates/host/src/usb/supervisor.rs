//! Worker thread lifecycle tied to open device sessions
//!
//! The supervisor keeps exactly one worker thread servicing the transfer
//! queue while at least one device session is open, and none otherwise. The
//! worker is started on the 0 -> 1 open transition and stopped and joined on
//! the 1 -> 0 close transition. Open-device count and termination flag live
//! under a single lock, which is never held across a blocking operation.

use crate::error::SupervisorError;
use crate::usb::engine::TransferEngine;
use crate::usb::queue::{TransferQueue, TransferSubmitter, create_transfer_queue};
use crate::usb::transfers::DeviceIo;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Guards worker lifecycle state
///
/// Invariant: `submitter` and `worker` are `Some` exactly while
/// `open_devices > 0`.
struct SupervisorState {
    open_devices: usize,
    terminate: bool,
    submitter: Option<TransferSubmitter>,
    worker: Option<JoinHandle<()>>,
}

/// Owns the background worker that services queued transfers
///
/// Callers hold the supervisor in an [`Arc`] and open sessions through it;
/// there is no global instance.
pub struct EventLoopSupervisor {
    state: Mutex<SupervisorState>,
}

impl Default for EventLoopSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopSupervisor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SupervisorState {
                open_devices: 0,
                terminate: false,
                submitter: None,
                worker: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a device session
    ///
    /// The first open starts the worker thread; a failure to start it fails
    /// the open outright, since a session without a worker could never
    /// deliver a completion to a waiter.
    pub fn open(
        self: &Arc<Self>,
        io: Arc<dyn DeviceIo>,
    ) -> Result<UsbSession, SupervisorError> {
        let submitter = self.register_open()?;
        Ok(UsbSession {
            supervisor: Arc::clone(self),
            io,
            submitter,
            closed: false,
        })
    }

    /// Number of currently open sessions
    pub fn open_devices(&self) -> usize {
        self.lock().open_devices
    }

    /// Whether the worker thread is currently running
    pub fn worker_running(&self) -> bool {
        self.lock().worker.is_some()
    }

    fn register_open(self: &Arc<Self>) -> Result<TransferSubmitter, SupervisorError> {
        let mut state = self.lock();

        let submitter = if let Some(submitter) = state.submitter.as_ref() {
            submitter.clone()
        } else {
            let (submitter, queue) = create_transfer_queue();
            let supervisor = Arc::clone(self);
            let handle = thread::Builder::new()
                .name("usb-transfer-worker".to_string())
                .spawn(move || worker_loop(supervisor, queue))
                .map_err(SupervisorError::WorkerStartFailed)?;

            state.terminate = false;
            state.worker = Some(handle);
            state.submitter = Some(submitter.clone());
            debug!("transfer worker started");
            submitter
        };

        state.open_devices += 1;
        Ok(submitter)
    }

    fn register_close(&self) {
        let (submitter, worker) = {
            let mut state = self.lock();
            if state.open_devices == 0 {
                warn!("unbalanced session close ignored");
                return;
            }
            state.open_devices -= 1;
            if state.open_devices > 0 {
                return;
            }
            state.terminate = true;
            (state.submitter.take(), state.worker.take())
        };

        // Shutdown and join happen outside the lock; the worker takes the
        // same lock each iteration to observe the terminate flag.
        if let Some(submitter) = submitter {
            submitter.shutdown();
        }
        if let Some(worker) = worker {
            debug!("waiting for transfer worker to stop");
            if worker.join().is_err() {
                error!("transfer worker panicked");
            }
        }
    }
}

/// Worker loop: execute queued transfers until told to terminate
///
/// Continuations run here, never on a caller thread. The lock is released
/// before blocking on the queue, and leftover jobs are cancelled on the way
/// out so no waiter stays blocked across a shutdown.
fn worker_loop(supervisor: Arc<EventLoopSupervisor>, queue: TransferQueue) {
    loop {
        {
            let state = supervisor.lock();
            if state.terminate {
                break;
            }
        }
        match queue.recv() {
            Some(job) => job.execute(),
            None => break,
        }
    }
    queue.drain();
    debug!("transfer worker stopped");
}

/// One open device handle, registered with the supervisor
///
/// Closing consumes the session, so a double close is impossible; dropping an
/// unclosed session closes it.
pub struct UsbSession {
    supervisor: Arc<EventLoopSupervisor>,
    io: Arc<dyn DeviceIo>,
    submitter: TransferSubmitter,
    closed: bool,
}

impl UsbSession {
    /// Build a transfer engine bound to this session
    pub fn engine(&self, timeout: Duration, read_len: usize) -> TransferEngine {
        TransferEngine::new(self, timeout, read_len)
    }

    /// Close the session; the last close stops and joins the worker
    pub fn close(mut self) {
        self.shutdown();
    }

    pub(crate) fn io(&self) -> Arc<dyn DeviceIo> {
        Arc::clone(&self.io)
    }

    pub(crate) fn submitter(&self) -> TransferSubmitter {
        self.submitter.clone()
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.supervisor.register_close();
        }
    }
}

impl Drop for UsbSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
