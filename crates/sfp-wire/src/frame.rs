use bytes::Bytes;

use crate::checksum::ChecksumAlgorithm;
use crate::error::WireError;

/// Start-of-frame sentinel.
pub const START_MARKER: u8 = 0xAA;

/// End-of-frame sentinel.
pub const END_MARKER: u8 = 0x55;

/// Version written by default encoders.
pub const DEFAULT_VERSION: u8 = 0x01;

/// Start marker + version + 2-byte length.
pub const HEADER_SIZE: usize = 4;

/// 2-byte checksum + end marker.
pub const TRAILER_SIZE: usize = 3;

/// Fixed bytes around every payload.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + TRAILER_SIZE;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + MAX_PAYLOAD_LEN;

/// Total on-wire size of a frame carrying `length` payload bytes.
pub const fn frame_len(length: u16) -> usize {
    FRAME_OVERHEAD + length as usize
}

/// The fixed-size prefix of a frame.
///
/// ```text
/// ┌────────┬──────┬──────────────────────────────────┐
/// │ Offset │ Size │ Field                            │
/// ├────────┼──────┼──────────────────────────────────┤
/// │ 0      │ 1    │ start marker (0xAA)              │
/// │ 1      │ 1    │ version                          │
/// │ 2      │ 2    │ payload length, big-endian       │
/// │ 4      │ len  │ payload                          │
/// │ 4+len  │ 2    │ checksum over [1 .. 4+len), BE   │
/// │ 6+len  │ 1    │ end marker (0x55)                │
/// └────────┴──────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub length: u16,
}

impl FrameHeader {
    pub fn new(version: u8, length: u16) -> Self {
        Self { version, length }
    }

    /// Total frame span this header announces.
    pub fn frame_len(self) -> usize {
        frame_len(self.length)
    }

    /// Write the 4-byte header into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn write_to(self, buf: &mut [u8]) -> Result<(), WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        buf[0] = START_MARKER;
        buf[1] = self.version;
        buf[2..4].copy_from_slice(&self.length.to_be_bytes());

        Ok(())
    }
}

/// A validated frame: version plus an owned copy of the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub version: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(version: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            version,
            payload: payload.into(),
        }
    }

    /// Size this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Decode one complete frame from the start of `buf` with the wire
    /// default checksum.
    ///
    /// # Returns
    ///
    /// `(frame, bytes_consumed)` on success.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if `buf` ends before the frame does.
    /// - Any per-candidate error from [`decode_header`] or [`decode_frame`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), WireError> {
        Self::decode_with(buf, ChecksumAlgorithm::default())
    }

    /// Same as [`Frame::decode`] with an explicit checksum algorithm.
    ///
    /// # Errors
    ///
    /// See [`Frame::decode`].
    pub fn decode_with(
        buf: &[u8],
        algorithm: ChecksumAlgorithm,
    ) -> Result<(Self, usize), WireError> {
        let eof = WireError::UnexpectedEof { offset: buf.len() };
        let header = decode_header(buf, 0)?.ok_or(eof.clone())?;
        let frame = decode_frame(buf, 0, header, algorithm)?.ok_or(eof)?;
        Ok((frame, header.frame_len()))
    }
}

/// Read the header of the candidate frame starting at `offset`.
///
/// # Returns
///
/// - `Ok(Some(header))` once the marker, version and length are available.
/// - `Ok(None)` when fewer than [`HEADER_SIZE`] bytes are available from
///   `offset`; the caller should wait for more input.
///
/// # Errors
///
/// [`WireError::InvalidMarker`] if the byte at `offset` is not
/// [`START_MARKER`]. The marker is checked first, so a single wrong byte is
/// rejected without waiting for the rest of the header.
pub fn decode_header(buf: &[u8], offset: usize) -> Result<Option<FrameHeader>, WireError> {
    let Some(candidate) = buf.get(offset..) else {
        return Ok(None);
    };

    match candidate.first() {
        None => return Ok(None),
        Some(&START_MARKER) => {}
        Some(&found) => return Err(WireError::InvalidMarker { offset, found }),
    }

    if candidate.len() < HEADER_SIZE {
        return Ok(None);
    }

    Ok(Some(FrameHeader {
        version: candidate[1],
        length: u16::from_be_bytes([candidate[2], candidate[3]]),
    }))
}

/// Validate the full candidate frame at `offset` described by `header`.
///
/// Validation order: checksum first, end marker second.
///
/// # Returns
///
/// - `Ok(Some(frame))` with the payload copied out of `buf`.
/// - `Ok(None)` if the whole span (`header.frame_len()` bytes) is not yet
///   available from `offset`.
///
/// # Errors
///
/// - [`WireError::InvalidChecksum`] if the checksum does not match.
/// - [`WireError::InvalidEndMarker`] if the final byte is not [`END_MARKER`].
pub fn decode_frame(
    buf: &[u8],
    offset: usize,
    header: FrameHeader,
    algorithm: ChecksumAlgorithm,
) -> Result<Option<Frame>, WireError> {
    let span = header.frame_len();
    let Some(candidate) = offset
        .checked_add(span)
        .and_then(|end| buf.get(offset..end))
    else {
        return Ok(None);
    };

    let payload_end = HEADER_SIZE + usize::from(header.length);

    let computed = algorithm.compute(&candidate[1..payload_end]);
    let found = u16::from_be_bytes([candidate[payload_end], candidate[payload_end + 1]]);
    if computed != found {
        return Err(WireError::InvalidChecksum { computed, found });
    }

    let end = candidate[span - 1];
    if end != END_MARKER {
        return Err(WireError::InvalidEndMarker { found: end });
    }

    Ok(Some(Frame {
        version: header.version,
        payload: Bytes::copy_from_slice(&candidate[HEADER_SIZE..payload_end]),
    }))
}

// `buf.get(offset..end)` returns None instead of panicking when the range runs
// past the end of the slice. That single call is the "is the whole span here
// yet?" check, and `checked_add` keeps a huge offset from wrapping around on
// 32-bit targets. After it succeeds every index below is in bounds, because
// `payload_end + 2 == span - 1`.

#[cfg(test)]
mod tests {
    use super::*;

    /// "Hello" at version 1 with its CCITT-FALSE checksum.
    const HELLO: [u8; 12] = [
        0xAA, 0x01, 0x00, 0x05, b'H', b'e', b'l', b'l', b'o', 0xFE, 0x3A, 0x55,
    ];

    #[test]
    fn decode_hello_frame() {
        let (frame, consumed) = Frame::decode(&HELLO).unwrap();
        assert_eq!(frame.version, 0x01);
        assert_eq!(&frame.payload[..], b"Hello");
        assert_eq!(consumed, HELLO.len());
        assert_eq!(frame.encoded_len(), HELLO.len());
    }

    #[test]
    fn header_needs_four_bytes() {
        assert_eq!(decode_header(&HELLO[..3], 0), Ok(None));
        assert_eq!(decode_header(&[], 0), Ok(None));
        assert_eq!(
            decode_header(&HELLO[..4], 0),
            Ok(Some(FrameHeader::new(0x01, 5)))
        );
    }

    #[test]
    fn header_rejects_wrong_marker_immediately() {
        let result = decode_header(&[0x00, 0xBB], 1);
        assert_eq!(
            result,
            Err(WireError::InvalidMarker {
                offset: 1,
                found: 0xBB
            })
        );
    }

    #[test]
    fn header_offset_past_end_is_incomplete() {
        assert_eq!(decode_header(&HELLO, 40), Ok(None));
    }

    #[test]
    fn frame_incomplete_until_last_byte() {
        let header = decode_header(&HELLO, 0).unwrap().unwrap();
        for cut in HEADER_SIZE..HELLO.len() {
            let result = decode_frame(&HELLO[..cut], 0, header, ChecksumAlgorithm::default());
            assert_eq!(result, Ok(None), "cut at {cut}");
        }
    }

    #[test]
    fn frame_at_nonzero_offset() {
        let mut buf = vec![0x00, 0x13, 0x37];
        buf.extend_from_slice(&HELLO);
        let header = decode_header(&buf, 3).unwrap().unwrap();
        let frame = decode_frame(&buf, 3, header, ChecksumAlgorithm::default())
            .unwrap()
            .unwrap();
        assert_eq!(&frame.payload[..], b"Hello");
    }

    #[test]
    fn reject_bad_checksum() {
        let mut buf = HELLO;
        buf[9] = 0x12;
        buf[10] = 0x34;
        assert_eq!(
            Frame::decode(&buf),
            Err(WireError::InvalidChecksum {
                computed: 0xFE3A,
                found: 0x1234
            })
        );
    }

    #[test]
    fn reject_bad_end_marker() {
        let mut buf = HELLO;
        buf[11] = 0x66;
        assert_eq!(
            Frame::decode(&buf),
            Err(WireError::InvalidEndMarker { found: 0x66 })
        );
    }

    #[test]
    fn checksum_is_checked_before_end_marker() {
        let mut buf = HELLO;
        buf[4] = b'J';
        buf[11] = 0x66;
        assert!(matches!(
            Frame::decode(&buf),
            Err(WireError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn wrong_algorithm_fails_checksum() {
        let result = Frame::decode_with(&HELLO, ChecksumAlgorithm::Modbus);
        assert!(matches!(result, Err(WireError::InvalidChecksum { .. })));
    }

    #[test]
    fn truncated_one_shot_is_eof() {
        assert_eq!(
            Frame::decode(&HELLO[..7]),
            Err(WireError::UnexpectedEof { offset: 7 })
        );
    }

    #[test]
    fn empty_payload_frame() {
        // version 1, length 0, checksum 0xFBAC
        let buf = [0xAA, 0x01, 0x00, 0x00, 0xFB, 0xAC, 0x55];
        let (frame, consumed) = Frame::decode(&buf).unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(consumed, FRAME_OVERHEAD);
    }

    #[test]
    fn header_write_then_read() {
        let mut buf = [0u8; HEADER_SIZE];
        FrameHeader::new(0x7F, 0x1234).write_to(&mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0x7F, 0x12, 0x34]);
        assert_eq!(
            decode_header(&buf, 0),
            Ok(Some(FrameHeader::new(0x7F, 0x1234)))
        );
    }

    #[test]
    fn header_write_needs_room() {
        let mut buf = [0u8; 2];
        assert_eq!(
            FrameHeader::new(1, 0).write_to(&mut buf),
            Err(WireError::UnexpectedEof { offset: 2 })
        );
    }

    #[test]
    fn frame_len_limits() {
        assert_eq!(frame_len(0), 7);
        assert_eq!(frame_len(u16::MAX), MAX_FRAME_LEN);
    }
}
