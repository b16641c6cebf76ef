use bytes::{Buf, BytesMut};
use sfp_wire::error::WireError;
use sfp_wire::frame::{self, Frame, FrameHeader, START_MARKER};
use tracing::{debug, trace, warn};

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::stats::DecoderStats;

/// Buffer capacity reserved up front; typical socket reads fit without
/// reallocating.
const INITIAL_CAPACITY: usize = 4 * 1024;

/// Where the decoder is in the current candidate frame.
///
/// ```text
///            marker found            header complete
///  Scanning ─────────────▶ HeaderWait ───────────────▶ BodyWait
///     ▲  ▲                    │                          │
///     │  │  bad header        │                          │ span complete
///     │  └────────────────────┘ (drop 1 byte)            ▼
///     │                                          ┌── validate ──┐
///     │          bad checksum / end marker       │              │ ok
///     ├──────────────────────────────────────────┘              ▼
///     │           (drop 1 byte)                          emit, drop span
///     └─────────────────────────────────────────────────────────┘
/// ```
///
/// Emitting is transient and never observable between `feed` calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    /// Looking for a start marker.
    Scanning,
    /// Start marker at buffer offset 0, waiting for the 4-byte header.
    HeaderWait,
    /// Header accepted, waiting for the full frame span.
    BodyWait { header: FrameHeader },
}

/// A candidate frame discarded by resynchronization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Absolute stream offset of the candidate's first byte, counted from
    /// the first byte ever fed (or from the last reset).
    pub offset: u64,
    pub reason: WireError,
}

/// Everything a `feed` call can report, in stream order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecoderEvent {
    Frame(Frame),
    Rejected(Rejection),
}

/// Resynchronizing stream decoder, one instance per connection.
///
/// Bytes go in through [`feed`](Self::feed) in whatever pieces the transport
/// delivers them; validated frames come out in stream order. Corrupt
/// candidates are dropped one byte at a time so a genuine start marker
/// hidden inside a damaged frame is still found, and the connection keeps
/// working for the frames that follow.
///
/// `feed` takes `&mut self`: the decoder has no interior locking and expects
/// the owner of the connection's read loop to drive it. It performs no I/O
/// and never blocks, so it fits equally in a thread, a task or a callback.
///
/// # Example
///
/// ```rust
/// use sfp_decoder::StreamDecoder;
///
/// let wire = [0xAA, 0x01, 0x00, 0x05, b'H', b'e', b'l', b'l', b'o', 0xFE, 0x3A, 0x55];
/// let mut decoder = StreamDecoder::new();
///
/// assert!(decoder.feed(&wire[..7]).unwrap().is_empty());
/// let frames = decoder.feed(&wire[7..]).unwrap();
/// assert_eq!(&frames[0].payload[..], b"Hello");
/// ```
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: BytesMut,
    state: DecoderState,
    config: DecoderConfig,
    stats: DecoderStats,
    /// Stream offset of `buffer[0]`.
    consumed: u64,
    /// Stream offset just past the last emitted frame.
    frame_end: u64,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY.min(config.max_buffer_size)),
            state: DecoderState::Scanning,
            config,
            stats: DecoderStats::default(),
            consumed: 0,
            frame_end: 0,
        }
    }

    /// Append received bytes and return every frame they complete.
    ///
    /// # Errors
    ///
    /// [`DecodeError::BufferOverflow`] once more than `max_buffer_size`
    /// bytes have arrived without completing a frame, counting the bytes
    /// that were already pending. A long run of valid frames in one call
    /// never trips it. The buffer is released before returning, along with
    /// any frames decoded earlier in the same call; the caller is expected
    /// to close the connection.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Frame>, DecodeError> {
        let frames = self
            .feed_events(bytes)?
            .into_iter()
            .filter_map(|event| match event {
                DecoderEvent::Frame(frame) => Some(frame),
                DecoderEvent::Rejected(_) => None,
            })
            .collect();
        Ok(frames)
    }

    /// Like [`feed`](Self::feed), but also reports each rejected candidate.
    ///
    /// # Errors
    ///
    /// See [`feed`](Self::feed).
    pub fn feed_events(&mut self, bytes: &[u8]) -> Result<Vec<DecoderEvent>, DecodeError> {
        let limit = self.config.max_buffer_size;
        let mut events = Vec::new();
        // bytes seen since the last frame completed, including those held over
        let mut unframed = self.buffer.len();
        let mut rest = bytes;

        while !rest.is_empty() {
            let take = limit.saturating_sub(self.buffer.len()).min(rest.len());
            if take == 0 {
                return Err(self.overflow(unframed.saturating_add(rest.len())));
            }
            let (piece, tail) = rest.split_at(take);
            self.buffer.extend_from_slice(piece);
            rest = tail;
            unframed = unframed.saturating_add(take);

            let frames_before = self.stats.frames;
            self.drain(&mut events);
            if self.stats.frames > frames_before {
                let received = self.consumed + self.buffer.len() as u64;
                unframed = usize::try_from(received - self.frame_end).unwrap_or(usize::MAX);
            }
            if unframed > limit {
                return Err(self.overflow(unframed.saturating_add(rest.len())));
            }
        }
        Ok(events)
    }

    /// Drop all buffered bytes and start scanning afresh. Counters are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Scanning;
        self.consumed = 0;
        self.frame_end = 0;
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Bytes received but not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn overflow(&mut self, pending: usize) -> DecodeError {
        self.stats.overflows += 1;
        warn!(
            pending,
            limit = self.config.max_buffer_size,
            "receive buffer overflow, dropping pending bytes"
        );
        self.reset();
        self.buffer = BytesMut::new();
        DecodeError::BufferOverflow {
            buffered: pending,
            limit: self.config.max_buffer_size,
        }
    }

    /// Run the state machine until it needs more input.
    fn drain(&mut self, events: &mut Vec<DecoderEvent>) {
        loop {
            match self.state {
                DecoderState::Scanning => {
                    match self.buffer.iter().position(|&b| b == START_MARKER) {
                        Some(at) => {
                            self.discard_noise(at);
                            self.state = DecoderState::HeaderWait;
                        }
                        None => {
                            // no byte left here can start a frame
                            let all = self.buffer.len();
                            self.discard_noise(all);
                            return;
                        }
                    }
                }

                DecoderState::HeaderWait => match frame::decode_header(&self.buffer, 0) {
                    Ok(None) => return,
                    Ok(Some(header)) => match self.config.check_header(header) {
                        Ok(()) => self.state = DecoderState::BodyWait { header },
                        Err(reason) => self.reject(reason, events),
                    },
                    Err(reason) => self.reject(reason, events),
                },

                DecoderState::BodyWait { header } => {
                    match frame::decode_frame(&self.buffer, 0, header, self.config.checksum) {
                        Ok(None) => return,
                        Ok(Some(frame)) => self.emit(header, frame, events),
                        Err(reason) => self.reject(reason, events),
                    }
                }
            }
        }
    }

    fn emit(&mut self, header: FrameHeader, frame: Frame, events: &mut Vec<DecoderEvent>) {
        trace!(
            offset = self.consumed,
            version = frame.version,
            len = frame.payload.len(),
            "frame decoded"
        );
        self.stats.frames += 1;
        self.stats.payload_bytes += frame.payload.len() as u64;
        self.advance(header.frame_len());
        self.frame_end = self.consumed;
        self.state = DecoderState::Scanning;
        events.push(DecoderEvent::Frame(frame));
    }

    /// Give up on the candidate at offset 0: drop only its marker byte so
    /// any marker inside the candidate is scanned next.
    fn reject(&mut self, reason: WireError, events: &mut Vec<DecoderEvent>) {
        debug!(
            offset = self.consumed,
            kind = reason.kind(),
            %reason,
            "frame candidate rejected"
        );
        self.stats.record_rejection(&reason);
        events.push(DecoderEvent::Rejected(Rejection {
            offset: self.consumed,
            reason,
        }));
        self.advance(1);
        self.state = DecoderState::Scanning;
    }

    fn discard_noise(&mut self, n: usize) {
        if n > 0 {
            trace!(offset = self.consumed, n, "discarding bytes before start marker");
            self.stats.noise_bytes += n as u64;
            self.advance(n);
        }
    }

    fn advance(&mut self, n: usize) {
        self.buffer.advance(n);
        self.consumed += n as u64;
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}
