//! Roundtrip integration tests: encoder output through every decode path.
//!
//! A payload encoded by [`FrameEncoder`] must come back unchanged from
//! [`Frame::decode`], from [`StreamDecoder`] and from [`FrameReader`], for
//! every version byte and for payload sizes at the edges of the 16-bit
//! length field.

use sfp_decoder::{DecoderConfig, FrameReader, StreamDecoder};
use sfp_encoder::{EncodeError, FrameEncoder, encode};
use sfp_wire::frame::{FRAME_OVERHEAD, MAX_PAYLOAD_LEN};
use sfp_wire::{ChecksumAlgorithm, Frame};

fn roundtrip(version: u8, payload: &[u8]) {
    let wire = encode(version, payload).unwrap();
    assert_eq!(wire.len(), payload.len() + FRAME_OVERHEAD);

    let (frame, consumed) = Frame::decode(&wire).unwrap();
    assert_eq!(consumed, wire.len());
    assert_eq!(frame.version, version);
    assert_eq!(&frame.payload[..], payload);

    let frames = StreamDecoder::new().feed(&wire).unwrap();
    assert_eq!(frames, vec![frame]);
}

#[test]
fn every_version_byte() {
    for version in 0..=u8::MAX {
        roundtrip(version, b"versioned");
    }
}

#[test]
fn payload_size_edges() {
    for len in [0, 1, 2, 255, 256, 4096, 4097, MAX_PAYLOAD_LEN - 1, MAX_PAYLOAD_LEN] {
        let payload = vec![0x5A; len];
        roundtrip(0x01, &payload);
    }
}

#[test]
fn payload_made_of_markers() {
    roundtrip(0x01, &[0xAA; 64]);
    roundtrip(0x01, &[0x55; 64]);
    roundtrip(0xAA, &[0xAA, 0x55, 0xAA, 0x55]);
}

#[test]
fn one_byte_too_many() {
    let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
    assert!(matches!(
        encode(0x01, &payload),
        Err(EncodeError::PayloadTooLarge { size: 65536, limit: 65535 })
    ));
}

#[test]
fn modbus_roundtrip_needs_modbus_decoder() {
    let wire = FrameEncoder::new()
        .checksum(ChecksumAlgorithm::Modbus)
        .encode(b"diagnostic")
        .unwrap();

    assert!(StreamDecoder::new().feed(&wire).unwrap().is_empty());

    let config = DecoderConfig {
        checksum: ChecksumAlgorithm::Modbus,
        ..DecoderConfig::default()
    };
    let frames = StreamDecoder::with_config(config).feed(&wire).unwrap();
    assert_eq!(&frames[0].payload[..], b"diagnostic");
}

#[test]
fn frame_new_matches_decoded_frame() {
    let wire = encode(0x07, b"abc").unwrap();
    let (decoded, _) = Frame::decode(&wire).unwrap();
    assert_eq!(decoded, Frame::new(0x07, &b"abc"[..]));
    assert_eq!(decoded.encoded_len(), wire.len());
}

#[tokio::test]
async fn frame_reader_over_a_duplex_pipe() {
    use tokio::io::AsyncWriteExt;

    let (mut tx, rx) = tokio::io::duplex(256);
    let payloads: Vec<Vec<u8>> = (0..50u8).map(|i| vec![i; usize::from(i) * 7]).collect();

    let expected = payloads.clone();
    let writer = tokio::spawn(async move {
        let encoder = FrameEncoder::new();
        for payload in &payloads {
            tx.write_all(&encoder.encode(payload).unwrap()).await.unwrap();
        }
    });

    let mut reader = FrameReader::new(rx);
    let mut received = Vec::new();
    while let Some(frame) = reader.next_frame().await {
        received.push(frame.unwrap().payload.to_vec());
    }
    writer.await.unwrap();

    assert_eq!(received, expected);
    assert_eq!(reader.decoder().stats().frames, 50);
}
