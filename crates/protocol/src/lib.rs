//! Wire protocol for the usb-widget
//!
//! This crate defines the framed command/response format carried over the
//! widget's bulk endpoints. It is pure encode/decode logic with no I/O and is
//! safe to call from any thread.
//!
//! # Example
//!
//! ```
//! use protocol::{commands, decode_frame, encode_frame};
//!
//! let frame = encode_frame(commands::ECHO, &[1, 2, 3]).unwrap();
//! let parsed = decode_frame(&frame).unwrap();
//! assert_eq!(parsed.command, commands::ECHO);
//! assert_eq!(parsed.payload, vec![1, 2, 3]);
//! ```

pub mod error;
pub mod frame;

pub use error::{FrameError, Result};
pub use frame::{
    END_OF_FRAME, HEADER_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE, PACKET_SIZE, ParsedFrame,
    START_OF_FRAME, commands, decode_frame, encode_frame,
};
