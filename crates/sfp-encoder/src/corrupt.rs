//! Fault injection for encoded frames.
//!
//! A receiver is only as good as its handling of broken input. These
//! mutations take a well-formed frame from [`FrameEncoder`](crate::FrameEncoder)
//! and damage exactly one aspect of it, so a test or a probe can check that
//! the receiver rejects the frame and stays in sync for the next one.
//!
//! ```text
//! ┌──────────────────┬────────────────────────────────────────────────┐
//! │ Corruption       │ Effect on  AA vv LL LL <payload> CC CC 55      │
//! ├──────────────────┼────────────────────────────────────────────────┤
//! │ StartMarker(b)   │ byte 0 replaced by b                           │
//! │ Version(v)       │ byte 1 replaced by v, checksum left stale      │
//! │ EndMarker(b)     │ last byte replaced by b                        │
//! │ Checksum(c)      │ CC CC replaced by c (big-endian)               │
//! │ Length(n)        │ LL LL replaced by n, nothing else changes      │
//! │ Truncate(n)      │ only the first n bytes are kept                │
//! │ FlipPayloadBit   │ one payload bit inverted, checksum left stale  │
//! └──────────────────┴────────────────────────────────────────────────┘
//! ```

use sfp_wire::frame::{FRAME_OVERHEAD, HEADER_SIZE, START_MARKER};

use crate::error::EncodeError;

/// A single deliberate defect applied to an encoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corruption {
    StartMarker(u8),
    Version(u8),
    EndMarker(u8),
    Checksum(u16),
    Length(u16),
    Truncate(usize),
    FlipPayloadBit { index: usize, bit: u8 },
}

impl Corruption {
    /// Apply the defect to `frame` in place.
    ///
    /// # Errors
    ///
    /// [`EncodeError::MalformedFrame`] if `frame` is not a complete encoded
    /// frame (too short, no start marker, or a length field that disagrees
    /// with the buffer size), or if `FlipPayloadBit` points outside the
    /// payload.
    pub fn apply(self, frame: &mut Vec<u8>) -> Result<(), EncodeError> {
        let payload_len = payload_len(frame)?;
        let len = frame.len();

        match self {
            Self::StartMarker(byte) => frame[0] = byte,
            Self::Version(version) => frame[1] = version,
            Self::EndMarker(byte) => frame[len - 1] = byte,
            Self::Checksum(crc) => frame[len - 3..len - 1].copy_from_slice(&crc.to_be_bytes()),
            Self::Length(declared) => frame[2..4].copy_from_slice(&declared.to_be_bytes()),
            Self::Truncate(keep) => frame.truncate(keep),
            Self::FlipPayloadBit { index, bit } => {
                if index >= payload_len || bit > 7 {
                    return Err(EncodeError::MalformedFrame { len });
                }
                frame[HEADER_SIZE + index] ^= 1 << bit;
            }
        }

        Ok(())
    }

    /// Copy `frame` and apply the defect to the copy.
    ///
    /// # Errors
    ///
    /// See [`Corruption::apply`].
    pub fn applied_to(self, frame: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut copy = frame.to_vec();
        self.apply(&mut copy)?;
        Ok(copy)
    }
}

fn payload_len(frame: &[u8]) -> Result<usize, EncodeError> {
    let malformed = EncodeError::MalformedFrame { len: frame.len() };
    if frame.len() < FRAME_OVERHEAD || frame[0] != START_MARKER {
        return Err(malformed);
    }
    let declared = usize::from(u16::from_be_bytes([frame[2], frame[3]]));
    if declared + FRAME_OVERHEAD != frame.len() {
        return Err(malformed);
    }
    Ok(declared)
}
