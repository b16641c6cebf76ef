/// Per-candidate framing errors.
///
/// Every variant describes one candidate frame that cannot be accepted.
/// None of them is fatal to a connection: the stream decoder absorbs them
/// by resynchronizing. "Need more bytes" is not an error and never shows up
/// here; the decode functions signal it with `Ok(None)`.
///
/// ```text
///   WireError
///   ├── InvalidMarker       ← byte at the candidate offset is not 0xAA
///   ├── InvalidChecksum     ← recomputed checksum differs from the wire value
///   ├── InvalidEndMarker    ← byte after the checksum is not 0x55
///   ├── UnsupportedVersion  ← version rejected by the receiver's policy
///   ├── LengthTooLarge      ← declared length above the receiver's policy
///   └── UnexpectedEof       ← one-shot decode ran out of input
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The candidate does not begin with the start marker.
    #[error("invalid start marker at offset {offset}: expected 0xAA, got {found:#04X}")]
    InvalidMarker { offset: usize, found: u8 },

    /// Checksum over `version ‖ length ‖ payload` does not match.
    #[error("checksum mismatch: computed {computed:#06X}, frame carries {found:#06X}")]
    InvalidChecksum { computed: u16, found: u16 },

    /// The byte following the checksum is not the end marker.
    #[error("invalid end marker: expected 0x55, got {found:#04X}")]
    InvalidEndMarker { found: u8 },

    /// The header carries a version the receiver was configured to refuse.
    #[error("unsupported version {version:#04X}, expected {expected:#04X}")]
    UnsupportedVersion { version: u8, expected: u8 },

    /// The header declares a payload longer than the receiver accepts.
    #[error("declared payload length {length} exceeds limit {limit}")]
    LengthTooLarge { length: u16, limit: u16 },

    /// Input ended before a complete frame could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },
}

impl WireError {
    /// Short stable label, used as a counter key and in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidMarker { .. } => "invalid_marker",
            Self::InvalidChecksum { .. } => "invalid_checksum",
            Self::InvalidEndMarker { .. } => "invalid_end_marker",
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::LengthTooLarge { .. } => "length_too_large",
            Self::UnexpectedEof { .. } => "unexpected_eof",
        }
    }
}
