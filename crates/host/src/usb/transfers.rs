//! Transfer jobs and the device I/O seam
//!
//! A [`TransferJob`] is one queued bulk transfer plus the continuation to run
//! when it completes. Jobs are executed by the supervisor's worker thread, so
//! continuations always run there, never on the caller thread.
//!
//! [`DeviceIo`] is the seam between the engine and the transport: the
//! production implementation wraps a claimed rusb handle, tests substitute
//! scripted devices.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Outcome status of a single bulk transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Transfer finished normally
    Completed,
    /// Per-transfer timeout elapsed before completion
    TimedOut,
    /// Endpoint stalled
    Stalled,
    /// Transfer was cancelled before it ran (worker shutting down)
    Cancelled,
    /// Device disappeared
    NoDevice,
    /// Device delivered more data than the buffer could hold
    Overflow,
    /// Any other transport failure
    Failed,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferStatus::Completed => "completed",
            TransferStatus::TimedOut => "timed out",
            TransferStatus::Stalled => "stalled",
            TransferStatus::Cancelled => "cancelled",
            TransferStatus::NoDevice => "no device",
            TransferStatus::Overflow => "overflow",
            TransferStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bulk I/O against one open device
///
/// Both calls block until the transfer finishes or the timeout elapses; they
/// are only ever invoked from the worker thread.
pub trait DeviceIo: Send + Sync {
    /// Write `data` to the bulk OUT endpoint, returning the transferred length
    fn write_bulk(&self, data: &[u8], timeout: Duration) -> Result<usize, TransferStatus>;

    /// Read up to `buf.len()` bytes from the bulk IN endpoint
    fn read_bulk(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransferStatus>;
}

/// Typed completion delivered to a job's continuation
#[derive(Debug, Clone)]
pub struct Completion {
    pub status: TransferStatus,
    /// Bytes actually moved across the bus
    pub transferred: usize,
    /// Received bytes; empty for OUT transfers and failed transfers
    pub data: Vec<u8>,
}

impl Completion {
    fn failed(status: TransferStatus) -> Self {
        Self {
            status,
            transferred: 0,
            data: Vec::new(),
        }
    }
}

/// Direction and buffer of one queued transfer
pub(crate) enum TransferOp {
    BulkOut { data: Vec<u8> },
    BulkIn { len: usize },
}

pub(crate) type CompleteFn = Box<dyn FnOnce(Completion) + Send>;

/// One queued bulk transfer with its completion continuation
pub(crate) struct TransferJob {
    pub(crate) io: Arc<dyn DeviceIo>,
    pub(crate) op: TransferOp,
    pub(crate) timeout: Duration,
    pub(crate) complete: CompleteFn,
}

impl TransferJob {
    /// Perform the transfer and invoke the continuation with the result
    pub(crate) fn execute(self) {
        let completion = match self.op {
            TransferOp::BulkOut { data } => match self.io.write_bulk(&data, self.timeout) {
                Ok(n) => {
                    trace!("out transfer completed, {} bytes", n);
                    Completion {
                        status: TransferStatus::Completed,
                        transferred: n,
                        data: Vec::new(),
                    }
                }
                Err(status) => Completion::failed(status),
            },
            TransferOp::BulkIn { len } => {
                let mut buf = vec![0u8; len];
                match self.io.read_bulk(&mut buf, self.timeout) {
                    Ok(n) => {
                        trace!("in transfer completed, {} bytes", n);
                        buf.truncate(n);
                        Completion {
                            status: TransferStatus::Completed,
                            transferred: n,
                            data: buf,
                        }
                    }
                    Err(status) => Completion::failed(status),
                }
            }
        };
        (self.complete)(completion);
    }

    /// Complete the job with a cancelled status without touching the device
    pub(crate) fn cancel(self) {
        (self.complete)(Completion::failed(TransferStatus::Cancelled));
    }
}

/// Map rusb errors to transfer statuses
pub(crate) fn map_transfer_status(err: rusb::Error) -> TransferStatus {
    match err {
        rusb::Error::Timeout => TransferStatus::TimedOut,
        rusb::Error::Pipe => TransferStatus::Stalled,
        rusb::Error::NoDevice | rusb::Error::NotFound => TransferStatus::NoDevice,
        rusb::Error::Overflow => TransferStatus::Overflow,
        _ => TransferStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::testing::{IoStep, ScriptedDevice};
    use std::sync::Mutex;

    #[test]
    fn test_map_transfer_status() {
        assert_eq!(
            map_transfer_status(rusb::Error::Timeout),
            TransferStatus::TimedOut
        );
        assert_eq!(
            map_transfer_status(rusb::Error::Pipe),
            TransferStatus::Stalled
        );
        assert_eq!(
            map_transfer_status(rusb::Error::NoDevice),
            TransferStatus::NoDevice
        );
        assert_eq!(
            map_transfer_status(rusb::Error::Overflow),
            TransferStatus::Overflow
        );
        assert_eq!(map_transfer_status(rusb::Error::Io), TransferStatus::Failed);
    }

    #[test]
    fn test_execute_out_transfer() {
        let device = Arc::new(ScriptedDevice::new(vec![IoStep::Write(Ok(5))]));
        let seen: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let job = TransferJob {
            io: device.clone(),
            op: TransferOp::BulkOut {
                data: vec![1, 2, 3, 4, 5],
            },
            timeout: Duration::from_millis(10),
            complete: Box::new(move |c| {
                *sink.lock().unwrap() = Some(c);
            }),
        };
        job.execute();

        let completion = seen.lock().unwrap().take().unwrap();
        assert_eq!(completion.status, TransferStatus::Completed);
        assert_eq!(completion.transferred, 5);
        assert_eq!(device.writes(), vec![vec![1, 2, 3, 4, 5]]);
    }

    #[test]
    fn test_execute_in_transfer_truncates_to_actual_length() {
        let device = Arc::new(ScriptedDevice::new(vec![IoStep::Read(Ok(vec![9, 8, 7]))]));
        let seen: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let job = TransferJob {
            io: device,
            op: TransferOp::BulkIn { len: 64 },
            timeout: Duration::from_millis(10),
            complete: Box::new(move |c| {
                *sink.lock().unwrap() = Some(c);
            }),
        };
        job.execute();

        let completion = seen.lock().unwrap().take().unwrap();
        assert_eq!(completion.status, TransferStatus::Completed);
        assert_eq!(completion.data, vec![9, 8, 7]);
    }

    #[test]
    fn test_cancel_never_touches_the_device() {
        let device = Arc::new(ScriptedDevice::new(vec![]));
        let seen: Arc<Mutex<Option<Completion>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let job = TransferJob {
            io: device.clone(),
            op: TransferOp::BulkOut { data: vec![1] },
            timeout: Duration::from_millis(10),
            complete: Box::new(move |c| {
                *sink.lock().unwrap() = Some(c);
            }),
        };
        job.cancel();

        let completion = seen.lock().unwrap().take().unwrap();
        assert_eq!(completion.status, TransferStatus::Cancelled);
        assert!(device.writes().is_empty());
    }
}
