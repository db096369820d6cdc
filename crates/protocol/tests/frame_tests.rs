//! Frame codec round-trip tests

use protocol::{
    FrameError, HEADER_SIZE, MAX_PAYLOAD_SIZE, PACKET_SIZE, commands, decode_frame, encode_frame,
};

#[test]
fn test_round_trip_unpadded() {
    let payload: Vec<u8> = (0..37).collect();
    let frame = encode_frame(commands::ECHO, &payload).unwrap();
    assert_eq!(frame.len(), HEADER_SIZE + payload.len() + 1); // no pad byte

    let parsed = decode_frame(&frame).unwrap();
    assert_eq!(parsed.command, commands::ECHO);
    assert_eq!(parsed.payload, payload);
}

#[test]
fn test_round_trip_padded() {
    // Header (5) + payload + end marker (1) == 64 forces the pad byte
    let payload = vec![0xaa; PACKET_SIZE - HEADER_SIZE - 1];
    let frame = encode_frame(commands::TX_DMX, &payload).unwrap();
    assert_eq!(frame.len(), PACKET_SIZE + 1);
    assert_eq!(*frame.last().unwrap(), 0);

    let parsed = decode_frame(&frame).unwrap();
    assert_eq!(parsed.command, commands::TX_DMX);
    assert_eq!(parsed.payload, payload);
}

#[test]
fn test_round_trip_two_packet_boundary() {
    // 122-byte payload encodes to exactly two full packets before padding
    let payload = vec![0x55; 2 * PACKET_SIZE - HEADER_SIZE - 1];
    let frame = encode_frame(commands::TX_DMX, &payload).unwrap();
    assert_eq!(frame.len(), 2 * PACKET_SIZE + 1);

    let parsed = decode_frame(&frame).unwrap();
    assert_eq!(parsed.payload, payload);
}

#[test]
fn test_round_trip_empty_payload() {
    let frame = encode_frame(commands::ECHO, &[]).unwrap();
    let parsed = decode_frame(&frame).unwrap();
    assert_eq!(parsed.command, commands::ECHO);
    assert!(parsed.payload.is_empty());
}

#[test]
fn test_round_trip_all_legal_lengths_near_boundaries() {
    for len in [56, 57, 58, 59, 120, 121, 122, 123, MAX_PAYLOAD_SIZE] {
        let payload: Vec<u8> = (0..len).map(|i| (i & 0xff) as u8).collect();
        let frame = encode_frame(0x0102, &payload).unwrap();
        let parsed = decode_frame(&frame).unwrap();
        assert_eq!(parsed.command, 0x0102, "len {}", len);
        assert_eq!(parsed.payload, payload, "len {}", len);
    }
}

#[test]
fn test_pad_present_iff_boundary() {
    for len in 0..=200usize {
        let frame = encode_frame(commands::ECHO, &vec![0; len]).unwrap();
        let unpadded = HEADER_SIZE + len + 1;
        if unpadded % PACKET_SIZE == 0 {
            assert_eq!(frame.len(), unpadded + 1, "len {} should be padded", len);
        } else {
            assert_eq!(frame.len(), unpadded, "len {} should not be padded", len);
        }
    }
}

#[test]
fn test_oversized_payload_is_an_error_not_a_truncation() {
    let payload = vec![0; MAX_PAYLOAD_SIZE + 1];
    match encode_frame(commands::ECHO, &payload) {
        Err(FrameError::PayloadTooLarge { len, max }) => {
            assert_eq!(len, MAX_PAYLOAD_SIZE + 1);
            assert_eq!(max, MAX_PAYLOAD_SIZE);
        }
        other => panic!("expected PayloadTooLarge, got {:?}", other),
    }
}
