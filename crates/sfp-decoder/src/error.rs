/// Connection-level decoding failures.
///
/// Per-frame corruption never shows up here: bad markers, bad checksums and
/// policy rejections are absorbed by resynchronization and reported as
/// [`DecoderEvent::Rejected`](crate::DecoderEvent::Rejected). What remains
/// is fatal to the connection.
///
/// ```text
///   DecodeError
///   ├── BufferOverflow      ← peer sent more unframed data than the bound allows
///   └── Io(std::io::Error)  ← from the reader behind a FrameReader
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Buffered bytes would exceed the configured bound without yielding a
    /// frame. The declared length field is attacker-controlled, so it never
    /// justifies buffering past this limit. The host should close the
    /// connection.
    #[error("receive buffer overflow: {buffered} bytes pending, limit {limit}")]
    BufferOverflow { buffered: usize, limit: usize },

    /// An I/O error from the underlying async reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
