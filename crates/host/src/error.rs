//! Host error types

use thiserror::Error;

/// Errors returned by [`crate::usb::TransferEngine`]
#[derive(Debug, Error)]
pub enum EngineError {
    /// Frame encoding failed; nothing was submitted
    #[error("encode failed: {0}")]
    Encode(#[from] protocol::FrameError),

    /// A previous exchange on this engine has not completed yet
    #[error("an exchange is already in flight")]
    ExchangeInFlight,

    /// No request was submitted since the last result was consumed
    #[error("no exchange in flight")]
    NoExchangeInFlight,

    /// The transfer queue rejected the submission: the worker is not
    /// running, or the queue is full
    #[error("transfer submission failed: worker not running or queue full")]
    SubmissionFailed,
}

/// Errors returned by [`crate::usb::EventLoopSupervisor`]
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The worker thread could not be spawned; the open fails outright
    #[error("failed to start transfer worker: {0}")]
    WorkerStartFailed(#[source] std::io::Error),
}

/// Errors from locating and opening the widget
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no device found matching {vendor_id:04x}:{product_id:04x}")]
    NotFound { vendor_id: u16, product_id: u16 },

    #[error("failed to enumerate devices: {0}")]
    Enumerate(#[source] rusb::Error),

    #[error("failed to open device: {0}")]
    Open(#[source] rusb::Error),

    #[error("failed to claim interface {interface}: {source}")]
    ClaimInterface { interface: u8, source: rusb::Error },
}
