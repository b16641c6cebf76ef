use std::io::Write;

use sfp_wire::checksum::ChecksumAlgorithm;
use sfp_wire::frame::{DEFAULT_VERSION, END_MARKER, FRAME_OVERHEAD, FrameHeader, HEADER_SIZE, MAX_PAYLOAD_LEN};

use crate::error::EncodeError;

/// Frame encoder: wraps payloads into complete wire frames.
///
/// Holds the two settings every outgoing frame depends on: the version byte
/// and the checksum algorithm. Both default to the wire contract (version
/// `0x01`, CRC-16/CCITT-FALSE). Setters return `&mut Self` so the encoder can
/// be configured in one chain:
///
/// ```rust
/// use sfp_encoder::FrameEncoder;
///
/// let frame = FrameEncoder::new()
///     .version(0x01)
///     .encode(b"Hello")
///     .unwrap();
///
/// assert_eq!(
///     frame,
///     [0xAA, 0x01, 0x00, 0x05, b'H', b'e', b'l', b'l', b'o', 0xFE, 0x3A, 0x55]
/// );
/// ```
///
/// # Output layout
///
/// ```text
/// ┌──────────┬──────────────────────────────────────────┐
/// │ [1 byte] │ start marker 0xAA                        │
/// │ [1 byte] │ version                                  │
/// │ [2 bytes]│ payload length (big-endian)              │
/// │ [N bytes]│ payload                                  │
/// │ [2 bytes]│ checksum over version..payload (BE)      │
/// │ [1 byte] │ end marker 0x55                          │
/// └──────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FrameEncoder {
    version: u8,
    algorithm: ChecksumAlgorithm,
}

impl FrameEncoder {
    /// Create an encoder with the wire defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION,
            algorithm: ChecksumAlgorithm::default(),
        }
    }

    /// Set the version byte written into every frame.
    pub fn version(&mut self, version: u8) -> &mut Self {
        self.version = version;
        self
    }

    /// Set the checksum algorithm.
    ///
    /// Only change this to talk to a receiver that was configured with the
    /// same non-default algorithm.
    pub fn checksum(&mut self, algorithm: ChecksumAlgorithm) -> &mut Self {
        self.algorithm = algorithm;
        self
    }

    pub fn current_version(&self) -> u8 {
        self.version
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Encode `payload` into a freshly allocated frame.
    ///
    /// # Errors
    ///
    /// [`EncodeError::PayloadTooLarge`] if `payload` is longer than 65535
    /// bytes.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
        self.encode_into(payload, &mut out)?;
        Ok(out)
    }

    /// Append the encoded frame to `out`, returning the number of bytes
    /// appended. Nothing is appended when the payload is rejected.
    ///
    /// # Errors
    ///
    /// [`EncodeError::PayloadTooLarge`] if `payload` is longer than 65535
    /// bytes.
    pub fn encode_into(&self, payload: &[u8], out: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let header = self.header_for(payload)?;

        let mut header_buf = [0u8; HEADER_SIZE];
        header.write_to(&mut header_buf)?;

        let mut digest = self.algorithm.digest();
        digest.update(&header_buf[1..]);
        digest.update(payload);
        let crc = digest.finish();

        out.reserve(header.frame_len());
        out.extend_from_slice(&header_buf);
        out.extend_from_slice(payload);
        out.extend_from_slice(&crc.to_be_bytes());
        out.push(END_MARKER);

        Ok(header.frame_len())
    }

    /// Encode `payload` and write the frame to `w` with a single
    /// `write_all`.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::PayloadTooLarge`] if the payload does not fit.
    /// - [`EncodeError::Io`] if the writer fails.
    pub fn write_to(&self, payload: &[u8], w: &mut impl Write) -> Result<usize, EncodeError> {
        let frame = self.encode(payload)?;
        w.write_all(&frame)?;
        Ok(frame.len())
    }

    fn header_for(&self, payload: &[u8]) -> Result<FrameHeader, EncodeError> {
        let length = u16::try_from(payload.len()).map_err(|_| EncodeError::PayloadTooLarge {
            size: payload.len(),
            limit: MAX_PAYLOAD_LEN,
        })?;
        Ok(FrameHeader::new(self.version, length))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a single frame with the wire-default checksum.
///
/// # Errors
///
/// [`EncodeError::PayloadTooLarge`] if `payload` is longer than 65535 bytes.
pub fn encode(version: u8, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    FrameEncoder::new().version(version).encode(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfp_decoder::StreamDecoder;
    use sfp_wire::Frame;

    #[test]
    fn hello_golden_frame() {
        let frame = encode(0x01, b"Hello").unwrap();
        assert_eq!(
            frame,
            vec![0xAA, 0x01, 0x00, 0x05, 0x48, 0x65, 0x6C, 0x6C, 0x6F, 0xFE, 0x3A, 0x55]
        );
    }

    #[test]
    fn empty_payload() {
        let frame = encode(0x01, b"").unwrap();
        assert_eq!(frame, vec![0xAA, 0x01, 0x00, 0x00, 0xFB, 0xAC, 0x55]);
    }

    #[test]
    fn max_payload_is_accepted() {
        let payload = vec![0x42; MAX_PAYLOAD_LEN];
        let frame = encode(0x02, &payload).unwrap();
        assert_eq!(frame.len(), MAX_PAYLOAD_LEN + FRAME_OVERHEAD);
        assert_eq!(&frame[2..4], &[0xFF, 0xFF]);
    }

    #[test]
    fn oversized_payload_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let result = encode(0x01, &payload);
        assert!(matches!(
            result,
            Err(EncodeError::PayloadTooLarge {
                size: 65536,
                limit: 65535
            })
        ));
    }

    #[test]
    fn encode_into_leaves_buffer_untouched_on_error() {
        let mut out = vec![0x01, 0x02];
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert!(FrameEncoder::new().encode_into(&payload, &mut out).is_err());
        assert_eq!(out, vec![0x01, 0x02]);
    }

    #[test]
    fn encode_into_appends_back_to_back() {
        let encoder = FrameEncoder::new();
        let mut out = Vec::new();
        let first = encoder.encode_into(b"one", &mut out).unwrap();
        let second = encoder.encode_into(b"two", &mut out).unwrap();
        assert_eq!(out.len(), first + second);

        let (frame, consumed) = Frame::decode(&out).unwrap();
        assert_eq!(&frame.payload[..], b"one");
        let (frame, _) = Frame::decode(&out[consumed..]).unwrap();
        assert_eq!(&frame.payload[..], b"two");
    }

    #[test]
    fn write_to_writer() {
        let mut sink = Vec::new();
        let n = FrameEncoder::new().write_to(b"abc", &mut sink).unwrap();
        assert_eq!(n, sink.len());
        assert_eq!(sink[0], 0xAA);
        assert_eq!(*sink.last().unwrap(), 0x55);
    }

    #[test]
    fn modbus_frame_uses_other_checksum() {
        let frame = FrameEncoder::new()
            .checksum(ChecksumAlgorithm::Modbus)
            .encode(b"Hello")
            .unwrap();
        assert_eq!(&frame[9..11], &[0x61, 0xD2]);
        assert!(Frame::decode(&frame).is_err());
        assert!(Frame::decode_with(&frame, ChecksumAlgorithm::Modbus).is_ok());
    }

    #[test]
    fn stream_decoder_accepts_encoder_output() {
        let encoder = *FrameEncoder::new().version(0x09);
        let mut wire = Vec::new();
        for payload in [&b"alpha"[..], b"", b"gamma"] {
            encoder.encode_into(payload, &mut wire).unwrap();
        }

        let mut decoder = StreamDecoder::new();
        let frames = decoder.feed(&wire).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.version == 0x09));
        assert_eq!(&frames[2].payload[..], b"gamma");
    }
}
