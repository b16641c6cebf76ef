/// Implementation of `sfp send`.
///
/// The well-behaved counterpart to `probe`: connects to a receiver and
/// sends one request frame per interval, waiting for each ack before the
/// next send. The receiver steers the pace: an ack carrying an interval
/// command switches the send interval from then on.
///
/// ```text
///   connect ──▶ tick ──▶ send Request ──▶ wait for Ack
///      ▲                                    │
///      │          ack                       ├── interval cmd → retime ticks
///      │          ◀─────────────────────────┤
///      │                                    ├── timeout  → reconnect now
///      └──── wait --reconnect-ms ◀──────────┴── closed / write failed
/// ```
///
/// Runs until `--count` requests have been sent, or until Ctrl-C.
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use sfp_decoder::FrameReader;
use sfp_encoder::encode;
use sfp_wire::frame::DEFAULT_VERSION;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::SendArgs;
use crate::message::{Ack, Request};

/// Request type for plain text messages.
const TEXT_REQUEST: u8 = 0x01;

#[derive(Clone, Debug)]
pub struct SendConfig {
    pub addr: SocketAddr,
    pub body: Vec<u8>,
    /// Starting send interval; acks may replace it.
    pub interval: Duration,
    pub ack_timeout: Duration,
    /// Pause before reconnecting after the receiver went away.
    pub reconnect_delay: Duration,
    /// Stop after this many requests.
    pub count: Option<u64>,
}

impl From<&SendArgs> for SendConfig {
    fn from(args: &SendArgs) -> Self {
        Self {
            addr: args.addr,
            body: args.text.clone().into_bytes(),
            interval: Duration::from_millis(args.interval_ms),
            ack_timeout: Duration::from_millis(args.ack_timeout_ms),
            reconnect_delay: Duration::from_millis(args.reconnect_ms),
            count: args.count,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SendReport {
    pub sent: u64,
    pub acked: u64,
    pub ack_timeouts: u64,
    /// Connection attempts after the first one.
    pub reconnects: u64,
    pub interval_changes: u64,
    /// Interval in force when sending stopped.
    pub interval: Duration,
}

/// How one connection ended.
enum Ending {
    Done,
    AckTimeout,
    Closed,
}

/// Run the `sfp send` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the body does not fit
/// in a frame.
pub fn run(args: &SendArgs) -> Result<()> {
    let config = SendConfig::from(args);
    let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;

    let mut report = SendReport::default();
    runtime.block_on(async {
        tokio::select! {
            result = send(&config, &mut report) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                Ok(())
            }
        }
    })?;

    println!("Receiver:        {}", config.addr);
    println!("Sent:            {}", report.sent);
    println!("Acked:           {}", report.acked);
    println!("Ack timeouts:    {}", report.ack_timeouts);
    println!("Reconnects:      {}", report.reconnects);
    println!("Final interval:  {} ms", report.interval.as_millis());
    Ok(())
}

/// Send requests until `config.count` is reached, reconnecting as needed.
///
/// Counters accumulate in `report` as they happen, so a caller that stops
/// the future early still sees what was done.
///
/// # Errors
///
/// Returns an error only if a request cannot be encoded. Network failures
/// lead to reconnects, never to an error.
pub async fn send(config: &SendConfig, report: &mut SendReport) -> Result<()> {
    report.interval = config.interval;
    let mut message_id: u16 = 1;
    let mut first = true;

    while !finished(config, report) {
        if !first {
            report.reconnects += 1;
        }
        first = false;

        let stream = match TcpStream::connect(config.addr).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(addr = %config.addr, "connect failed: {e}");
                tokio::time::sleep(config.reconnect_delay).await;
                continue;
            }
        };
        info!(addr = %config.addr, "connected");

        match session(stream, config, report, &mut message_id).await? {
            Ending::Done => break,
            Ending::AckTimeout => {}
            Ending::Closed => tokio::time::sleep(config.reconnect_delay).await,
        }
    }
    Ok(())
}

fn finished(config: &SendConfig, report: &SendReport) -> bool {
    config.count.is_some_and(|count| report.sent >= count)
}

async fn session(
    stream: TcpStream,
    config: &SendConfig,
    report: &mut SendReport,
    message_id: &mut u16,
) -> Result<Ending> {
    let (read_half, mut write_half) = stream.into_split();
    let mut acks = FrameReader::new(read_half);
    let mut ticker = ticker_for(report.interval, Instant::now());

    loop {
        if finished(config, report) {
            write_half.shutdown().await.ok();
            return Ok(Ending::Done);
        }
        ticker.tick().await;

        let request = Request {
            kind: TEXT_REQUEST,
            message_id: *message_id,
            body: config.body.clone(),
        };
        let frame = encode(DEFAULT_VERSION, &request.to_bytes())?;
        if let Err(e) = write_half.write_all(&frame).await {
            warn!("send failed: {e}");
            return Ok(Ending::Closed);
        }
        debug!(message_id = *message_id, len = frame.len(), "sent");
        report.sent += 1;
        *message_id = message_id.wrapping_add(1);

        let Ok(ack) = tokio::time::timeout(config.ack_timeout, next_ack(&mut acks)).await else {
            report.ack_timeouts += 1;
            warn!(
                timeout_ms = config.ack_timeout.as_millis(),
                "no ack in time, reconnecting"
            );
            return Ok(Ending::AckTimeout);
        };
        let Some(ack) = ack else {
            info!("receiver closed the connection");
            return Ok(Ending::Closed);
        };

        report.acked += 1;
        debug!(ok = ack.ok, timestamp_ms = ack.timestamp_ms, "ack");
        match ack.interval_ms {
            Some(0) => warn!("ignoring zero interval command"),
            Some(ms) if Duration::from_millis(u64::from(ms)) != report.interval => {
                report.interval = Duration::from_millis(u64::from(ms));
                report.interval_changes += 1;
                info!(interval_ms = ms, "receiver changed the send interval");
                ticker = ticker_for(report.interval, Instant::now() + report.interval);
            }
            _ => {}
        }
    }
}

fn ticker_for(period: Duration, start: Instant) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Next well-formed ack, or `None` once the stream ends or fails.
async fn next_ack(acks: &mut FrameReader<OwnedReadHalf>) -> Option<Ack> {
    loop {
        match acks.next_frame().await? {
            Ok(frame) => match Ack::parse(&frame.payload) {
                Ok(ack) => return Some(ack),
                Err(e) => warn!("undecodable ack: {e}"),
            },
            Err(e) => {
                warn!("ack stream failed: {e}");
                return None;
            }
        }
    }
}
