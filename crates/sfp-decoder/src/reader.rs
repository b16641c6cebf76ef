use std::collections::VecDeque;

use sfp_wire::Frame;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::stream::{DecoderEvent, StreamDecoder};

/// Bytes requested from the reader per `read` call.
const READ_CHUNK: usize = 8 * 1024;

/// Asynchronous frame reader, yields frames from any `AsyncRead` source.
///
/// Pairs a [`StreamDecoder`] with a reader (a TCP stream, a serial port
/// wrapper, a file) and pulls bytes only when the caller asks for the next
/// item, so backpressure falls out of the `await`.
///
/// ```text
///   reader.read() ──▶ StreamDecoder::feed_events ──▶ pending queue ──▶ next_event()
/// ```
///
/// End of input with a partial frame still buffered is a clean end of
/// stream: the leftover bytes are logged and dropped. A
/// [`DecodeError`] ends the stream; every later call returns `None`.
///
/// # Example
///
/// ```rust,no_run
/// use sfp_decoder::FrameReader;
/// use tokio::net::TcpStream;
///
/// async fn print_frames(stream: TcpStream) {
///     let mut frames = FrameReader::new(stream);
///     while let Some(frame) = frames.next_frame().await.transpose().unwrap() {
///         println!("v{} {} bytes", frame.version, frame.payload.len());
///     }
/// }
/// ```
pub struct FrameReader<R> {
    reader: R,
    decoder: StreamDecoder,
    pending: VecDeque<DecoderEvent>,
    chunk: Vec<u8>,
    done: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    #[must_use]
    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self {
            reader,
            decoder: StreamDecoder::with_config(config),
            pending: VecDeque::new(),
            chunk: vec![0u8; READ_CHUNK],
            done: false,
        }
    }

    /// Next frame or rejection, in stream order.
    ///
    /// Returns `None` once the reader is exhausted or after an error has
    /// been returned.
    pub async fn next_event(&mut self) -> Option<Result<DecoderEvent, DecodeError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            let n = match self.reader.read(&mut self.chunk).await {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(DecodeError::Io(e)));
                }
            };

            if n == 0 {
                self.done = true;
                let leftover = self.decoder.buffered_len();
                if leftover > 0 {
                    debug!(leftover, "input ended inside a frame candidate");
                }
                continue;
            }

            match self.decoder.feed_events(&self.chunk[..n]) {
                Ok(events) => self.pending.extend(events),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Next valid frame, skipping rejections.
    pub async fn next_frame(&mut self) -> Option<Result<Frame, DecodeError>> {
        loop {
            match self.next_event().await? {
                Ok(DecoderEvent::Frame(frame)) => return Some(Ok(frame)),
                Ok(DecoderEvent::Rejected(_)) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// The decoder driving this reader, for its state and counters.
    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }

    /// Recover the underlying reader. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Rejection;
    use sfp_encoder::{Corruption, encode};
    use sfp_wire::WireError;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn frames_from_a_slice() {
        let mut wire = encode(0x01, b"one").unwrap();
        wire.extend(encode(0x01, b"two").unwrap());

        let mut reader = FrameReader::new(&wire[..]);
        let first = reader.next_frame().await.unwrap().unwrap();
        let second = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(&first.payload[..], b"one");
        assert_eq!(&second.payload[..], b"two");
        assert!(reader.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn frames_split_across_writes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let wire = encode(0x01, b"split across two writes").unwrap();

        let writer = tokio::spawn(async move {
            tx.write_all(&wire[..5]).await.unwrap();
            tx.flush().await.unwrap();
            tokio::task::yield_now().await;
            tx.write_all(&wire[5..]).await.unwrap();
        });

        let mut reader = FrameReader::new(rx);
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"split across two writes");
        writer.await.unwrap();
        assert!(reader.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn rejections_surface_as_events() {
        let mut wire = Corruption::EndMarker(0x66)
            .applied_to(&encode(0x01, b"bad").unwrap())
            .unwrap();
        wire.extend(encode(0x01, b"good").unwrap());

        let mut reader = FrameReader::new(&wire[..]);
        let first = reader.next_event().await.unwrap().unwrap();
        assert_eq!(
            first,
            DecoderEvent::Rejected(Rejection {
                offset: 0,
                reason: WireError::InvalidEndMarker { found: 0x66 }
            })
        );

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"good");
        assert_eq!(reader.decoder().stats().invalid_end_marker, 1);
    }

    #[tokio::test]
    async fn partial_frame_at_eof_ends_cleanly() {
        let wire = encode(0x01, b"cut short").unwrap();
        let mut reader = FrameReader::new(&wire[..wire.len() - 2]);
        assert!(reader.next_event().await.is_none());
        assert!(reader.decoder().buffered_len() > 0);
    }

    #[tokio::test]
    async fn overflow_ends_the_stream() {
        let config = DecoderConfig {
            max_buffer_size: 16,
            ..DecoderConfig::default()
        };
        let noise = [0u8; 64];
        let mut reader = FrameReader::with_config(&noise[..], config);

        assert!(matches!(
            reader.next_event().await,
            Some(Err(DecodeError::BufferOverflow { limit: 16, .. }))
        ));
        assert!(reader.next_event().await.is_none());
    }
}
