//! USB transfer core
//!
//! The pieces fit together like this: a caller opens a device session through
//! the [`EventLoopSupervisor`], which keeps exactly one worker thread running
//! while any session is open. The session's [`TransferEngine`] encodes a
//! request frame and submits a bulk write to the transfer queue; the worker
//! executes it and invokes the write-completion continuation, which submits
//! the matching bulk read; the read-completion continuation stores the result
//! and wakes the caller blocked in [`TransferEngine::wait`].

pub mod device;
pub mod engine;
pub mod queue;
pub mod supervisor;
pub mod testing;
pub mod transfers;

pub use device::UsbDeviceIo;
pub use engine::{ExchangeResult, ExchangeStage, TransferEngine};
pub use supervisor::{EventLoopSupervisor, UsbSession};
pub use transfers::{Completion, DeviceIo, TransferStatus};
