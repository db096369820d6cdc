//! Transfer queue between caller threads and the worker
//!
//! Completion dispatch is message passing rather than reentrant callbacks:
//! callers push [`TransferJob`]s onto a bounded channel, the worker pops them
//! one at a time, performs the I/O, and runs each job's continuation on its
//! own thread.

use crate::usb::transfers::TransferJob;
use async_channel::{Receiver, Sender, bounded};

/// Queue depth; a session only ever has one exchange in flight, so this is
/// generous headroom for multiple sessions
const QUEUE_DEPTH: usize = 256;

pub(crate) enum WorkerMessage {
    Submit(TransferJob),
    Shutdown,
}

/// Caller-side handle: submits jobs to the worker
#[derive(Clone)]
pub(crate) struct TransferSubmitter {
    tx: Sender<WorkerMessage>,
}

/// Error returned when the queue cannot take the job (worker stopped, or the
/// queue is full)
#[derive(Debug)]
pub(crate) struct SubmitRejected;

impl TransferSubmitter {
    /// Hand a job to the worker without blocking
    ///
    /// The worker itself submits chained jobs from completion continuations,
    /// so blocking on a full queue here could deadlock it against itself. A
    /// full queue means the worker is not keeping up; the submission fails
    /// and the caller reports it.
    pub(crate) fn submit(&self, job: TransferJob) -> Result<(), SubmitRejected> {
        self.tx
            .try_send(WorkerMessage::Submit(job))
            .map_err(|_| SubmitRejected)
    }

    /// Wake a blocked worker and tell it to stop
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send_blocking(WorkerMessage::Shutdown);
    }
}

/// Worker-side handle: receives jobs until shutdown
pub(crate) struct TransferQueue {
    rx: Receiver<WorkerMessage>,
}

impl TransferQueue {
    /// Block for the next job; `None` means shutdown was requested or all
    /// submitters are gone
    pub(crate) fn recv(&self) -> Option<TransferJob> {
        match self.rx.recv_blocking() {
            Ok(WorkerMessage::Submit(job)) => Some(job),
            Ok(WorkerMessage::Shutdown) | Err(_) => None,
        }
    }

    /// Shut the queue down: refuse new submissions, then cancel every job
    /// still buffered so no waiter is left blocked
    ///
    /// Closing before draining leaves no window where a racing submit can
    /// succeed yet never have its job executed or cancelled.
    pub(crate) fn drain(&self) {
        self.rx.close();
        while let Ok(msg) = self.rx.try_recv() {
            if let WorkerMessage::Submit(job) = msg {
                job.cancel();
            }
        }
    }
}

/// Create the queue pair shared by one worker and its sessions
pub(crate) fn create_transfer_queue() -> (TransferSubmitter, TransferQueue) {
    let (tx, rx) = bounded(QUEUE_DEPTH);
    (TransferSubmitter { tx }, TransferQueue { rx })
}
