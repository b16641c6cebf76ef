/// Implementation of `sfp listen`.
///
/// A reference receiver: every accepted TCP connection gets its own
/// [`FrameReader`] (and so its own decoder; nothing is shared between
/// connections). Valid frames are logged and answered with an ack frame;
/// rejected candidates are logged at `warn` and the connection carries on.
///
/// ```text
///   accept ──▶ spawn per connection
///                 │
///                 ├── Frame     → info!, write Ack frame
///                 ├── Rejected  → warn!, keep reading
///                 ├── overflow  → warn!, close
///                 ├── idle      → info!, close   (--idle-timeout)
///                 └── EOF       → info!, close
/// ```
///
/// The process runs until Ctrl-C.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sfp_decoder::{DecoderConfig, DecoderEvent, DecoderStats, FrameReader};
use sfp_encoder::encode;
use sfp_wire::Frame;
use sfp_wire::frame::DEFAULT_VERSION;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{Instrument, info, info_span, warn};

use crate::ListenArgs;
use crate::message::{Ack, Request};

/// Receiver settings shared by every connection.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListenConfig {
    pub decoder: DecoderConfig,
    /// Interval command attached to every ack.
    pub interval_ms: Option<u32>,
    pub idle_timeout: Option<Duration>,
}

impl From<&ListenArgs> for ListenConfig {
    fn from(args: &ListenArgs) -> Self {
        Self {
            decoder: DecoderConfig {
                max_buffer_size: args.max_buffer,
                accepted_version: args.accept_version,
                max_payload_len: args.max_payload,
                ..DecoderConfig::default()
            },
            interval_ms: args.interval_ms,
            idle_timeout: args.idle_timeout.map(Duration::from_secs),
        }
    }
}

/// Run the `sfp listen` command.
///
/// # Errors
///
/// Returns an error if the runtime cannot start, the address cannot be
/// bound, or accepting a connection fails.
pub fn run(args: &ListenArgs) -> Result<()> {
    let config = ListenConfig::from(args);
    let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;

    runtime.block_on(async {
        let listener = TcpListener::bind(args.bind)
            .await
            .with_context(|| format!("cannot bind {}", args.bind))?;
        info!(addr = %listener.local_addr()?, "listening");

        tokio::select! {
            result = serve(listener, config) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                Ok(())
            }
        }
    })
}

/// Accept connections forever, one task per connection.
///
/// # Errors
///
/// Returns an error only if `accept` itself fails; connection errors are
/// logged and end that connection alone.
pub async fn serve(listener: TcpListener, config: ListenConfig) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        tokio::spawn(
            async move {
                info!("connected");
                match handle_connection(stream, config).await {
                    Ok(stats) => info!(
                        frames = stats.frames,
                        rejected = stats.rejected(),
                        noise_bytes = stats.noise_bytes,
                        "disconnected"
                    ),
                    Err(e) => warn!("connection failed: {e:#}"),
                }
            }
            .instrument(info_span!("conn", %peer)),
        );
    }
}

/// Drive one connection until EOF, overflow or idle timeout.
///
/// # Errors
///
/// Returns an error if the socket fails or an ack cannot be written.
pub async fn handle_connection(stream: TcpStream, config: ListenConfig) -> Result<DecoderStats> {
    let (read_half, mut write_half) = stream.into_split();
    let mut frames = FrameReader::with_config(read_half, config.decoder);

    loop {
        let next = match config.idle_timeout {
            Some(limit) => {
                if let Ok(next) = tokio::time::timeout(limit, frames.next_event()).await {
                    next
                } else {
                    info!(idle_secs = limit.as_secs(), "idle timeout, closing");
                    break;
                }
            }
            None => frames.next_event().await,
        };

        match next {
            None => break,
            Some(Ok(DecoderEvent::Frame(frame))) => {
                log_frame(&frame);
                send_ack(&mut write_half, config.interval_ms).await?;
            }
            Some(Ok(DecoderEvent::Rejected(rejection))) => warn!(
                offset = rejection.offset,
                kind = rejection.reason.kind(),
                "invalid frame: {}",
                rejection.reason
            ),
            Some(Err(sfp_decoder::DecodeError::Io(e))) => {
                return Err(e).context("read failed");
            }
            Some(Err(e)) => {
                warn!("{e}, closing");
                break;
            }
        }
    }

    write_half.shutdown().await.ok();
    Ok(*frames.decoder().stats())
}

fn log_frame(frame: &Frame) {
    match Request::parse(&frame.payload) {
        Ok(request) => info!(
            version = frame.version,
            kind = request.kind,
            message_id = request.message_id,
            body = %String::from_utf8_lossy(&request.body),
            "request"
        ),
        Err(_) => info!(version = frame.version, len = frame.payload.len(), "frame"),
    }
}

async fn send_ack(writer: &mut OwnedWriteHalf, interval_ms: Option<u32>) -> Result<()> {
    let ack = Ack {
        ok: true,
        timestamp_ms: now_ms(),
        interval_ms,
    };
    let frame = encode(DEFAULT_VERSION, &ack.to_bytes())?;
    writer.write_all(&frame).await.context("cannot write ack")?;
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Bind an ephemeral local port and serve on it in the background.
#[cfg(test)]
pub(crate) async fn spawn_test_server(config: ListenConfig) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, config));
    addr
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfp_encoder::Corruption;
    use tokio::io::AsyncReadExt;

    async fn next_ack(reader: &mut FrameReader<tokio::net::tcp::OwnedReadHalf>) -> Ack {
        let frame = reader.next_frame().await.unwrap().unwrap();
        Ack::parse(&frame.payload).unwrap()
    }

    #[tokio::test]
    async fn acks_valid_frames_after_garbage() {
        let addr = spawn_test_server(ListenConfig {
            interval_ms: Some(250),
            ..ListenConfig::default()
        })
        .await;

        let (read_half, mut write_half) = TcpStream::connect(addr).await.unwrap().into_split();
        let mut wire = Corruption::Checksum(0x1234)
            .applied_to(&encode(0x01, b"Wrong CRC Test").unwrap())
            .unwrap();
        let request = Request {
            kind: 0x01,
            message_id: 7,
            body: b"hello".to_vec(),
        };
        wire.extend(encode(0x01, &request.to_bytes()).unwrap());
        write_half.write_all(&wire).await.unwrap();

        let mut acks = FrameReader::new(read_half);
        let ack = next_ack(&mut acks).await;
        assert!(ack.ok);
        assert_eq!(ack.interval_ms, Some(250));
        assert!(ack.timestamp_ms > 0);

        // still in sync for the next one
        write_half.write_all(&encode(0x01, b"again").unwrap()).await.unwrap();
        let ack = next_ack(&mut acks).await;
        assert!(ack.ok);
    }

    #[tokio::test]
    async fn each_connection_has_its_own_decoder() {
        let addr = spawn_test_server(ListenConfig::default()).await;
        let wire = encode(0x01, b"split").unwrap();

        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        first.write_all(&wire[..6]).await.unwrap();
        second.write_all(&wire).await.unwrap();

        let (second_read, _second_write) = second.into_split();
        let ack = next_ack(&mut FrameReader::new(second_read)).await;
        assert!(ack.ok);

        first.write_all(&wire[6..]).await.unwrap();
        let (first_read, _first_write) = first.into_split();
        let ack = next_ack(&mut FrameReader::new(first_read)).await;
        assert!(ack.ok);
    }

    #[tokio::test]
    async fn overflow_closes_connection() {
        let config = ListenConfig {
            decoder: DecoderConfig {
                max_buffer_size: 64,
                ..DecoderConfig::default()
            },
            ..ListenConfig::default()
        };
        let addr = spawn_test_server(config).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        // a header announcing more than the bound allows, then filler
        stream.write_all(&[0xAA, 0x01, 0x10, 0x00]).await.unwrap();
        stream.write_all(&[0u8; 128]).await.unwrap();

        let mut buf = [0u8; 16];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn idle_connections_are_closed() {
        let addr = spawn_test_server(ListenConfig {
            idle_timeout: Some(Duration::from_millis(50)),
            ..ListenConfig::default()
        })
        .await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}
