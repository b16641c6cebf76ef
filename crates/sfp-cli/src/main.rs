/// SFP command-line tool: build, decode, diagnose and exercise frames of
/// the Sentinel Frame Protocol over files and TCP.
///
/// # Command overview
///
/// ```text
/// sfp <COMMAND> [OPTIONS]
///
/// Commands:
///   encode     Wrap a payload into one frame
///   decode     Run a capture through the stream decoder
///   crc        Compare checksum algorithms for a payload or captured frame
///   probe      Send the malformed-frame battery to a receiver
///   listen     Run a receiver that acknowledges every valid frame
///   send       Send requests on an interval, following the receiver's acks
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Debug logging (RUST_LOG overrides)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Success                                          |
/// | 1    | Error (I/O failure, bad input, buffer overflow)  |
///
/// Logs and error details go to stderr so stdout can be piped cleanly.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use sfp_wire::ChecksumAlgorithm;
use tracing_subscriber::EnvFilter;

mod cmd_crc;
mod cmd_decode;
mod cmd_encode;
mod cmd_listen;
mod cmd_probe;
mod cmd_send;
mod message;
mod payload;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Sentinel Frame Protocol tool.
#[derive(Parser)]
#[command(name = "sfp", version, about = "Sentinel Frame Protocol CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (per-candidate rejections, connection events).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Wrap a payload into one frame.
    Encode(EncodeArgs),
    /// Run a capture file through the stream decoder.
    Decode(DecodeArgs),
    /// Compare CRC-16/CCITT-FALSE and CRC-16/MODBUS for a payload.
    Crc(CrcArgs),
    /// Send the malformed-frame battery to a receiver over TCP.
    Probe(ProbeArgs),
    /// Accept TCP connections and acknowledge every valid frame.
    Listen(ListenArgs),
    /// Send requests on an interval, following the receiver's acks.
    Send(SendArgs),
}

// ── Shared argument types ─────────────────────────────────────────────────────

/// Checksum algorithm selectable on the command line.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ChecksumArg {
    /// CRC-16/CCITT-FALSE (poly 0x1021, MSB-first). The wire default.
    #[default]
    Ccitt,
    /// CRC-16/MODBUS (poly 0xA001, LSB-first).
    Modbus,
}

impl From<ChecksumArg> for ChecksumAlgorithm {
    fn from(arg: ChecksumArg) -> Self {
        match arg {
            ChecksumArg::Ccitt => ChecksumAlgorithm::CcittFalse,
            ChecksumArg::Modbus => ChecksumAlgorithm::Modbus,
        }
    }
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `sfp encode`.
///
/// ```text
/// ┌──────────────────┬────────────────────────────────────────────────┐
/// │ Flag             │ Effect                                         │
/// ├──────────────────┼────────────────────────────────────────────────┤
/// │ --text / --hex / │ payload source (exactly one)                   │
/// │ --file           │                                                │
/// │ --frame-version  │ version byte (default 1)                       │
/// │ --checksum       │ ccitt (default) | modbus                       │
/// │ -o / --output    │ write raw frame bytes instead of printing hex  │
/// └──────────────────┴────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub input: payload::PayloadInput,

    /// Version byte written into the frame.
    #[arg(long, default_value_t = sfp_wire::frame::DEFAULT_VERSION)]
    pub frame_version: u8,

    /// Checksum algorithm.
    #[arg(long, value_enum, default_value_t)]
    pub checksum: ChecksumArg,

    /// Write the raw frame to this file instead of printing hex.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `sfp decode`.
///
/// The capture is fed to one decoder in `--chunk`-sized pieces, the way a
/// socket would deliver it. Frames go to stdout; rejections are printed
/// too when `--show-rejections` (or `-v`) is set.
#[derive(clap::Args)]
pub struct DecodeArgs {
    /// Raw byte capture to decode.
    pub file: PathBuf,

    /// Feed size in bytes (0 feeds the whole file at once).
    #[arg(long, default_value_t = 0)]
    pub chunk: usize,

    /// Checksum algorithm frames were built with.
    #[arg(long, value_enum, default_value_t)]
    pub checksum: ChecksumArg,

    /// Reject frames whose version differs.
    #[arg(long)]
    pub accept_version: Option<u8>,

    /// Reject frames declaring a longer payload.
    #[arg(long, default_value_t = u16::MAX)]
    pub max_payload: u16,

    /// Pending-byte bound before the decoder gives up.
    #[arg(long, default_value_t = sfp_decoder::DEFAULT_MAX_BUFFER_SIZE)]
    pub max_buffer: usize,

    /// Print rejected candidates as well as frames.
    #[arg(long)]
    pub show_rejections: bool,

    /// One JSON object per line instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `sfp crc`.
///
/// With a payload source, prints the checksum input and both candidate
/// frames. With `--frame`, reports which algorithm a captured frame's
/// checksum was computed with.
#[derive(clap::Args)]
pub struct CrcArgs {
    #[command(flatten)]
    pub input: payload::OptionalPayloadInput,

    /// A captured frame (hex) to diagnose instead of building one.
    #[arg(long, conflicts_with_all = ["text", "hex", "file"])]
    pub frame: Option<String>,

    /// Version byte used when building from a payload.
    #[arg(long, default_value_t = sfp_wire::frame::DEFAULT_VERSION)]
    pub frame_version: u8,
}

/// Arguments for `sfp probe`.
#[derive(clap::Args)]
pub struct ProbeArgs {
    /// Receiver address.
    #[arg(default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Pause after each case, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,

    /// Seed for the random-noise case.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `sfp listen`.
///
/// ```text
/// ┌──────────────────┬────────────────────────────────────────────────┐
/// │ Flag             │ Effect                                         │
/// ├──────────────────┼────────────────────────────────────────────────┤
/// │ --accept-version │ per-frame version filter                       │
/// │ --max-payload    │ per-frame declared length cap                  │
/// │ --max-buffer     │ pending bytes before the connection is closed  │
/// │ --interval-ms    │ include an interval command in every ack       │
/// │ --idle-timeout   │ close connections with no complete frame or    │
/// │                  │ rejection for this many seconds                │
/// └──────────────────┴────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct ListenArgs {
    /// Address to bind.
    #[arg(default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Reject frames whose version differs.
    #[arg(long)]
    pub accept_version: Option<u8>,

    /// Reject frames declaring a longer payload.
    #[arg(long, default_value_t = u16::MAX)]
    pub max_payload: u16,

    /// Pending-byte bound per connection.
    #[arg(long, default_value_t = sfp_decoder::DEFAULT_MAX_BUFFER_SIZE)]
    pub max_buffer: usize,

    /// Ask clients to send every N milliseconds (sent in each ack).
    #[arg(long)]
    pub interval_ms: Option<u32>,

    /// Close connections that produce no complete frame or rejection for
    /// this many seconds. Plain noise does not keep a connection open.
    #[arg(long)]
    pub idle_timeout: Option<u64>,
}

/// Arguments for `sfp send`.
///
/// ```text
/// ┌──────────────────┬────────────────────────────────────────────────┐
/// │ Flag             │ Effect                                         │
/// ├──────────────────┼────────────────────────────────────────────────┤
/// │ --text           │ request body                                   │
/// │ --interval-ms    │ starting interval; acks may change it          │
/// │ --ack-timeout-ms │ reconnect when an ack takes longer             │
/// │ --reconnect-ms   │ pause before reconnecting after a disconnect   │
/// │ --count          │ stop after this many requests                  │
/// └──────────────────┴────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct SendArgs {
    /// Receiver address.
    #[arg(default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Request body.
    #[arg(long, default_value = "ping")]
    pub text: String,

    /// Milliseconds between requests until the receiver sets another interval.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Milliseconds to wait for each ack.
    #[arg(long, default_value_t = 3000)]
    pub ack_timeout_ms: u64,

    /// Milliseconds to wait before reconnecting after a disconnect.
    #[arg(long, default_value_t = 3000)]
    pub reconnect_ms: u64,

    /// Stop after this many requests (default: run until Ctrl-C).
    #[arg(long)]
    pub count: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Encode(args) => cmd_encode::run(&args),
        Commands::Decode(args) => cmd_decode::run(&args, cli.verbose),
        Commands::Crc(args) => cmd_crc::run(&args),
        Commands::Probe(args) => cmd_probe::run(&args),
        Commands::Listen(args) => cmd_listen::run(&args),
        Commands::Send(args) => cmd_send::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
