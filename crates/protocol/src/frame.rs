//! Frame encoding and decoding
//!
//! The widget speaks a simple framed format over its bulk endpoints:
//!
//! ```text
//! [0x5a][command: u16 LE][length: u16 LE][payload...][0xa5][pad?]
//! ```
//!
//! A single zero pad byte is appended only when the encoded frame would
//! otherwise be an exact multiple of the endpoint packet size, so the device
//! side never has to treat a full-size final packet as "more data follows".

use crate::error::{FrameError, Result};

/// Start-of-frame marker
pub const START_OF_FRAME: u8 = 0x5a;

/// End-of-frame marker
pub const END_OF_FRAME: u8 = 0xa5;

/// Maximum payload length in bytes
pub const MAX_PAYLOAD_SIZE: usize = 513;

/// Bulk endpoint packet size; decides whether a pad byte is required
pub const PACKET_SIZE: usize = 64;

/// Bytes before the payload: start marker, command, payload length
pub const HEADER_SIZE: usize = 5;

/// Smallest legal frame: header plus end marker, empty payload
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 1;

/// Command identifiers understood by the widget
pub mod commands {
    /// Echo the payload back unchanged
    pub const ECHO: u16 = 0x80;
    /// Transmit the payload as a DMX frame
    pub const TX_DMX: u16 = 0x81;
}

/// A decoded frame: command identifier and payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub command: u16,
    pub payload: Vec<u8>,
}

/// Encode a command and payload into a wire frame
///
/// Fails with [`FrameError::PayloadTooLarge`] instead of truncating when the
/// payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn encode_frame(command: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + 2);
    frame.push(START_OF_FRAME);
    frame.extend_from_slice(&command.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    frame.push(END_OF_FRAME);

    if frame.len() % PACKET_SIZE == 0 {
        frame.push(0);
    }

    Ok(frame)
}

/// Decode a wire frame back into command and payload
///
/// Accepts a single trailing zero pad byte only when the consumed frame length
/// is a packet-size multiple; any other non-conforming structure is rejected
/// with a specific [`FrameError`] rather than silently accepted.
pub fn decode_frame(raw: &[u8]) -> Result<ParsedFrame> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Truncated {
            needed: MIN_FRAME_SIZE,
            available: raw.len(),
        });
    }
    if raw[0] != START_OF_FRAME {
        return Err(FrameError::BadStartMarker { found: raw[0] });
    }

    let command = u16::from_le_bytes([raw[1], raw[2]]);
    let len = u16::from_le_bytes([raw[3], raw[4]]) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let total = HEADER_SIZE + len + 1;
    if raw.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: raw.len(),
        });
    }
    let end = raw[HEADER_SIZE + len];
    if end != END_OF_FRAME {
        return Err(FrameError::BadEndMarker { found: end });
    }

    match &raw[total..] {
        [] => {}
        [0] if total % PACKET_SIZE == 0 => {}
        trailing => {
            return Err(FrameError::TrailingBytes {
                count: trailing.len(),
            });
        }
    }

    Ok(ParsedFrame {
        command,
        payload: raw[HEADER_SIZE..HEADER_SIZE + len].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_golden_frame() {
        let frame = encode_frame(commands::ECHO, &[1, 2, 3]).unwrap();
        assert_eq!(frame, vec![0x5a, 0x80, 0x00, 0x03, 0x00, 1, 2, 3, 0xa5]);
    }

    #[test]
    fn test_command_is_little_endian() {
        let frame = encode_frame(0x1234, &[]).unwrap();
        assert_eq!(&frame[1..3], &[0x34, 0x12]);
    }

    #[test]
    fn test_pad_byte_on_packet_boundary() {
        // 58-byte payload encodes to 64 bytes before padding
        let frame = encode_frame(commands::TX_DMX, &[0u8; 58]).unwrap();
        assert_eq!(frame.len(), 65);
        assert_eq!(frame[64], 0);
        assert_eq!(frame[63], END_OF_FRAME);
    }

    #[test]
    fn test_no_pad_byte_off_boundary() {
        for len in [0usize, 57, 59] {
            let frame = encode_frame(commands::TX_DMX, &vec![0u8; len]).unwrap();
            assert_eq!(frame.len(), HEADER_SIZE + len + 1);
            assert_eq!(*frame.last().unwrap(), END_OF_FRAME);
        }
    }

    #[test]
    fn test_payload_at_max_is_accepted() {
        let frame = encode_frame(commands::ECHO, &[0xff; MAX_PAYLOAD_SIZE]).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + MAX_PAYLOAD_SIZE + 1);
    }

    #[test]
    fn test_payload_over_max_is_rejected() {
        let result = encode_frame(commands::ECHO, &[0xff; MAX_PAYLOAD_SIZE + 1]);
        assert_eq!(
            result,
            Err(FrameError::PayloadTooLarge {
                len: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE,
            })
        );
    }

    #[test]
    fn test_decode_rejects_bad_start_marker() {
        let mut frame = encode_frame(commands::ECHO, &[1]).unwrap();
        frame[0] = 0x00;
        assert_eq!(
            decode_frame(&frame),
            Err(FrameError::BadStartMarker { found: 0x00 })
        );
    }

    #[test]
    fn test_decode_rejects_bad_end_marker() {
        let mut frame = encode_frame(commands::ECHO, &[1]).unwrap();
        let last = frame.len() - 1;
        frame[last] = 0x5a;
        assert_eq!(
            decode_frame(&frame),
            Err(FrameError::BadEndMarker { found: 0x5a })
        );
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let frame = encode_frame(commands::ECHO, &[1, 2, 3, 4]).unwrap();
        let result = decode_frame(&frame[..frame.len() - 2]);
        assert!(matches!(result, Err(FrameError::Truncated { .. })));
    }

    #[test]
    fn test_decode_rejects_trailing_garbage() {
        let mut frame = encode_frame(commands::ECHO, &[1]).unwrap();
        frame.push(0xde);
        assert_eq!(
            decode_frame(&frame),
            Err(FrameError::TrailingBytes { count: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_pad_off_boundary() {
        // A trailing zero is only a pad when the frame fills packets exactly
        let mut frame = encode_frame(commands::ECHO, &[1]).unwrap();
        frame.push(0);
        assert_eq!(
            decode_frame(&frame),
            Err(FrameError::TrailingBytes { count: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_oversized_declared_length() {
        let mut frame = vec![START_OF_FRAME, 0x80, 0x00];
        frame.extend_from_slice(&(600u16).to_le_bytes());
        frame.resize(610, 0);
        assert!(matches!(
            decode_frame(&frame),
            Err(FrameError::PayloadTooLarge { len: 600, .. })
        ));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(matches!(
            decode_frame(&[]),
            Err(FrameError::Truncated { needed: 6, .. })
        ));
    }
}
