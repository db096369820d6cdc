//! Host side of the usb-widget
//!
//! This crate drives framed command/response exchanges with the widget over
//! asynchronous bulk transfers. A dedicated worker thread services the
//! transfer queue for as long as at least one device session is open; caller
//! threads submit one request at a time and block for the response.

pub mod config;
pub mod error;
pub mod logging;
pub mod usb;

pub use config::HostConfig;
pub use error::{DeviceError, EngineError, SupervisorError};
pub use logging::setup_logging;
