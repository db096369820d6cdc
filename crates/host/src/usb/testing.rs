//! Test doubles for the transfer core
//!
//! Provides in-memory [`DeviceIo`] implementations so the engine and
//! supervisor can be exercised without hardware.
//!
//! # Example
//!
//! ```
//! use host::usb::testing::{IoStep, ScriptedDevice};
//!
//! let device = ScriptedDevice::new(vec![
//!     IoStep::Write(Ok(9)),
//!     IoStep::Read(Ok(vec![0x01, 0x02])),
//! ]);
//! assert!(device.writes().is_empty());
//! ```

use crate::usb::transfers::{DeviceIo, TransferStatus};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// One scripted I/O step
#[derive(Debug, Clone)]
pub enum IoStep {
    /// Result of the next `write_bulk`: transferred length or failure status
    Write(Result<usize, TransferStatus>),
    /// Result of the next `read_bulk`: delivered bytes or failure status
    Read(Result<Vec<u8>, TransferStatus>),
}

/// Device that replays a fixed script of transfer outcomes
///
/// Every bulk write is captured for later inspection. Running off the end of
/// the script, or hitting a step of the wrong direction, fails the transfer.
pub struct ScriptedDevice {
    steps: Mutex<VecDeque<IoStep>>,
    writes: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedDevice {
    pub fn new(steps: Vec<IoStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Frames written to the device so far
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().expect("writes lock").clone()
    }

    fn next_step(&self) -> Option<IoStep> {
        self.steps.lock().expect("steps lock").pop_front()
    }
}

impl DeviceIo for ScriptedDevice {
    fn write_bulk(&self, data: &[u8], _timeout: Duration) -> Result<usize, TransferStatus> {
        self.writes.lock().expect("writes lock").push(data.to_vec());
        match self.next_step() {
            Some(IoStep::Write(result)) => result,
            _ => Err(TransferStatus::Failed),
        }
    }

    fn read_bulk(&self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransferStatus> {
        match self.next_step() {
            Some(IoStep::Read(Ok(bytes))) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(IoStep::Read(Err(status))) => Err(status),
            _ => Err(TransferStatus::Failed),
        }
    }
}

/// Device whose writes block until the test releases them
///
/// Used to hold an exchange in flight deterministically.
pub struct GatedDevice {
    released: Mutex<bool>,
    gate: Condvar,
}

impl GatedDevice {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            released: Mutex::new(false),
            gate: Condvar::new(),
        }
    }

    /// Let a blocked write proceed
    pub fn release(&self) {
        let mut released = self.released.lock().expect("gate lock");
        *released = true;
        self.gate.notify_all();
    }

    /// Re-arm the gate so the next write blocks again
    pub fn reset(&self) {
        *self.released.lock().expect("gate lock") = false;
    }
}

impl DeviceIo for GatedDevice {
    fn write_bulk(&self, data: &[u8], _timeout: Duration) -> Result<usize, TransferStatus> {
        let mut released = self.released.lock().expect("gate lock");
        while !*released {
            released = self.gate.wait(released).expect("gate lock");
        }
        Ok(data.len())
    }

    fn read_bulk(&self, _buf: &mut [u8], _timeout: Duration) -> Result<usize, TransferStatus> {
        Ok(0)
    }
}
