/// Implementation of `sfp probe`.
///
/// Connects to a receiver and sends a fixed battery of frames, most of them
/// deliberately broken, over one connection. A well-behaved receiver
/// rejects each broken frame, stays connected, and acknowledges the valid
/// ones. Acks are read concurrently and reported under the case that was
/// last sent when they arrived.
///
/// # Battery
///
/// ```text
/// ┌────┬────────────────────┬─────────────────────────────────────────────┐
/// │ #  │ Case               │ Bytes sent                                  │
/// ├────┼────────────────────┼─────────────────────────────────────────────┤
/// │ 1  │ wrong start marker │ "Hello Server" frame, byte 0 = 0xBB         │
/// │ 2  │ wrong end marker   │ "Test End Marker" frame, last byte = 0x66   │
/// │ 3  │ wrong checksum     │ "Wrong CRC Test" frame, checksum = 0x1234   │
/// │ 4  │ truncated          │ first half of a "Truncated Frame" frame     │
/// │ 5  │ wrong length       │ "Wrong Length" frame, length field + 100    │
/// │ 6  │ empty payload      │ valid frame, zero-length payload            │
/// │ 7  │ random noise       │ N random bytes (default 50)                 │
/// │ 8  │ valid request      │ valid frame carrying a request message      │
/// │ 9  │ oversized payload  │ valid frame, 10 KiB payload                 │
/// │ 10 │ wrong version      │ "Wrong Version" frame, version = 0xFF       │
/// └────┴────────────────────┴─────────────────────────────────────────────┘
/// ```
///
/// A receiver holds a candidate whose declared length has not arrived yet,
/// so the truncated and wrong-length cases delay the acks of the frames
/// behind them. That delay is expected; losing those acks is not.
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfp_decoder::FrameReader;
use sfp_encoder::{Corruption, encode};
use sfp_wire::frame::DEFAULT_VERSION;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ProbeArgs;
use crate::message::{Ack, Request};
use crate::payload::spaced_hex_truncated;

/// Length of the random-noise case unless configured otherwise.
pub const DEFAULT_NOISE_LEN: usize = 50;

/// Size of the oversized-payload case.
const OVERSIZED_LEN: usize = 10 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeCase {
    WrongStartMarker,
    WrongEndMarker,
    WrongChecksum,
    Truncated,
    WrongLength,
    EmptyPayload,
    RandomNoise,
    ValidRequest,
    OversizedPayload,
    WrongVersion,
}

impl ProbeCase {
    pub const ALL: [Self; 10] = [
        Self::WrongStartMarker,
        Self::WrongEndMarker,
        Self::WrongChecksum,
        Self::Truncated,
        Self::WrongLength,
        Self::EmptyPayload,
        Self::RandomNoise,
        Self::ValidRequest,
        Self::OversizedPayload,
        Self::WrongVersion,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            Self::WrongStartMarker => "wrong start marker (0xBB)",
            Self::WrongEndMarker => "wrong end marker (0x66)",
            Self::WrongChecksum => "wrong checksum (0x1234)",
            Self::Truncated => "truncated frame (first half)",
            Self::WrongLength => "wrong length (+100)",
            Self::EmptyPayload => "empty payload",
            Self::RandomNoise => "random noise",
            Self::ValidRequest => "valid request",
            Self::OversizedPayload => "oversized payload (10 KiB)",
            Self::WrongVersion => "wrong version (0xFF)",
        }
    }

    /// Bytes this case puts on the wire.
    ///
    /// # Errors
    ///
    /// Only if a frame cannot be built, which the fixed payloads rule out.
    pub fn bytes(self, rng: &mut impl Rng, noise_len: usize) -> Result<Vec<u8>> {
        let frame = |payload: &[u8]| encode(DEFAULT_VERSION, payload);
        let bytes = match self {
            Self::WrongStartMarker => Corruption::StartMarker(0xBB).applied_to(&frame(b"Hello Server")?)?,
            Self::WrongEndMarker => Corruption::EndMarker(0x66).applied_to(&frame(b"Test End Marker")?)?,
            Self::WrongChecksum => Corruption::Checksum(0x1234).applied_to(&frame(b"Wrong CRC Test")?)?,
            Self::Truncated => {
                let full = frame(b"Truncated Frame")?;
                Corruption::Truncate(full.len() / 2).applied_to(&full)?
            }
            Self::WrongLength => {
                let payload = b"Wrong Length";
                #[allow(clippy::cast_possible_truncation)]
                let declared = payload.len() as u16 + 100;
                Corruption::Length(declared).applied_to(&frame(payload)?)?
            }
            Self::EmptyPayload => frame(b"")?,
            Self::RandomNoise => {
                let mut noise = vec![0u8; noise_len];
                rng.fill(&mut noise[..]);
                noise
            }
            Self::ValidRequest => frame(&probe_request().to_bytes())?,
            Self::OversizedPayload => frame(&vec![b'X'; OVERSIZED_LEN])?,
            Self::WrongVersion => Corruption::Version(0xFF).applied_to(&frame(b"Wrong Version")?)?,
        };
        Ok(bytes)
    }
}

fn probe_request() -> Request {
    Request {
        kind: 0x01,
        message_id: 1234,
        body: b"This is a VALID packet from sfp probe".to_vec(),
    }
}

/// Probe settings.
#[derive(Clone, Copy, Debug)]
pub struct ProbeConfig {
    pub addr: SocketAddr,
    /// Pause after each case; also how long to wait for trailing acks.
    pub delay: Duration,
    pub noise_len: usize,
    pub seed: Option<u64>,
}

impl From<&ProbeArgs> for ProbeConfig {
    fn from(args: &ProbeArgs) -> Self {
        Self {
            addr: args.addr,
            delay: Duration::from_millis(args.delay_ms),
            noise_len: DEFAULT_NOISE_LEN,
            seed: args.seed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CaseOutcome {
    pub case: ProbeCase,
    pub sent: Vec<u8>,
    /// Acks that arrived while this case was the latest one sent.
    pub acks: Vec<Ack>,
}

#[derive(Clone, Debug, Default)]
pub struct ProbeReport {
    pub cases: Vec<CaseOutcome>,
    /// Ack-stream problems: undecodable acks, or the receiver closing early.
    pub problems: Vec<String>,
}

impl ProbeReport {
    pub fn total_acks(&self) -> usize {
        self.cases.iter().map(|c| c.acks.len()).sum()
    }
}

/// What the ack reader task reports back.
enum AckEvent {
    Ack(Ack),
    Problem(String),
}

/// Run the `sfp probe` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot start, the receiver cannot be
/// reached, or a send fails.
pub fn run(args: &ProbeArgs) -> Result<()> {
    let config = ProbeConfig::from(args);
    let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;
    let report = runtime.block_on(probe(config))?;

    println!("Receiver: {}", config.addr);
    for (index, outcome) in report.cases.iter().enumerate() {
        println!(
            "[{:>2}] {:<28} {:>6} bytes  {}",
            index + 1,
            outcome.case.describe(),
            outcome.sent.len(),
            spaced_hex_truncated(&outcome.sent, 12)
        );
        for ack in &outcome.acks {
            let interval = ack
                .interval_ms
                .map_or_else(String::new, |ms| format!(", interval {ms} ms"));
            println!(
                "       ack: {} at {}{interval}",
                if ack.ok { "ok" } else { "error" },
                ack.timestamp_ms
            );
        }
    }
    for problem in &report.problems {
        println!("problem: {problem}");
    }

    println!();
    println!("{} acks received", report.total_acks());
    Ok(())
}

/// Send the battery and collect acknowledgements.
///
/// # Errors
///
/// Returns an error if the connection cannot be made or a write fails.
pub async fn probe(config: ProbeConfig) -> Result<ProbeReport> {
    let stream = TcpStream::connect(config.addr)
        .await
        .with_context(|| format!("cannot connect to {}", config.addr))?;
    let (read_half, mut write_half) = stream.into_split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        let mut frames = FrameReader::new(read_half);
        while let Some(next) = frames.next_frame().await {
            let event = match next {
                Ok(frame) => match Ack::parse(&frame.payload) {
                    Ok(ack) => AckEvent::Ack(ack),
                    Err(e) => AckEvent::Problem(format!("undecodable ack: {e}")),
                },
                Err(e) => AckEvent::Problem(format!("ack stream failed: {e}")),
            };
            if tx.send(event).is_err() {
                return;
            }
        }
        debug!("receiver closed the connection");
        tx.send(AckEvent::Problem("receiver closed the connection".into())).ok();
    });

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut report = ProbeReport::default();
    for case in ProbeCase::ALL {
        let sent = case.bytes(&mut rng, config.noise_len)?;
        debug!(?case, len = sent.len(), "sending");
        write_half
            .write_all(&sent)
            .await
            .with_context(|| format!("cannot send case {case:?}"))?;
        tokio::time::sleep(config.delay).await;

        let mut outcome = CaseOutcome {
            case,
            sent,
            acks: Vec::new(),
        };
        while let Ok(event) = rx.try_recv() {
            match event {
                AckEvent::Ack(ack) => outcome.acks.push(ack),
                AckEvent::Problem(problem) => {
                    warn!("{problem}");
                    report.problems.push(problem);
                }
            }
        }
        report.cases.push(outcome);
    }

    write_half.shutdown().await.ok();
    reader.abort();
    Ok(report)
}
