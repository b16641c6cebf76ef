use sfp_wire::WireError;

/// Errors that can occur while building outgoing frames.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── PayloadTooLarge      ← payload does not fit the 16-bit length field
///   ├── MalformedFrame       ← fault injection applied to a non-frame buffer
///   ├── Wire(WireError)      ← from sfp-wire header serialization
///   └── Io(std::io::Error)   ← from the writer passed to write_to
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("payload exceeds maximum frame payload ({size} bytes, limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("buffer of {len} bytes is not an encoded frame")]
    MalformedFrame { len: usize },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
