//! Frame codec error types

use thiserror::Error;

/// Errors produced while encoding or decoding a wire frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Payload exceeds the maximum message size
    #[error("payload too large: {len} bytes (max: {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Not enough bytes to hold the declared frame
    #[error("truncated frame: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// First byte is not the start-of-frame marker
    #[error("bad start marker: {found:#04x}")]
    BadStartMarker { found: u8 },

    /// Byte after the payload is not the end-of-frame marker
    #[error("bad end marker: {found:#04x}")]
    BadEndMarker { found: u8 },

    /// Bytes follow the end marker that are not a valid pad
    #[error("{count} unexpected trailing bytes after end marker")]
    TrailingBytes { count: usize },
}

/// Type alias for codec results
pub type Result<T> = std::result::Result<T, FrameError>;
