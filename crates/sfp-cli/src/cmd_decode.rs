/// Implementation of `sfp decode`.
///
/// Reads a raw capture (bytes exactly as they came off the wire) and feeds
/// it to one [`StreamDecoder`] in `--chunk`-sized pieces, the way a socket
/// or serial port would deliver it. Frames are printed as they complete,
/// followed by the decoder's counters.
///
/// # Example output
///
/// ```text
/// frame     v1  len 5      48 65 6C 6C 6F  "Hello"
/// rejected  @12  invalid_end_marker  invalid end marker: expected 0x55, got 0x66
/// frame     v1  len 4      67 6F 6F 64  "good"
///
/// Frames:    2 (9 payload bytes)
/// Rejected:  1
/// Noise:     14 bytes
/// Pending:   0 bytes
/// ```
///
/// With `--json`, each line is one JSON object tagged by `"event"`
/// (`frame`, `rejected`, `summary`).
///
/// A `BufferOverflow` ends the run with exit code 1, like a receiver
/// closing the connection.
use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use sfp_decoder::{DecoderConfig, DecoderEvent, DecoderStats, StreamDecoder};

use crate::DecodeArgs;
use crate::payload::spaced_hex_truncated;

/// Payload bytes shown per frame in text mode.
const PREVIEW_BYTES: usize = 16;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonLine<'a> {
    Frame {
        version: u8,
        length: usize,
        payload_hex: String,
    },
    Rejected {
        offset: u64,
        kind: &'a str,
        reason: String,
    },
    Summary {
        frames: u64,
        payload_bytes: u64,
        rejected: u64,
        noise_bytes: u64,
        pending_bytes: usize,
    },
}

/// Run the `sfp decode` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, stdout cannot be written,
/// or the decoder overflows its buffer bound.
pub fn run(args: &DecodeArgs, verbose: bool) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let config = DecoderConfig {
        max_buffer_size: args.max_buffer,
        checksum: args.checksum.into(),
        accepted_version: args.accept_version,
        max_payload_len: args.max_payload,
    };
    let mut decoder = StreamDecoder::with_config(config);
    let show_rejections = args.show_rejections || verbose;

    let chunk = if args.chunk == 0 { bytes.len().max(1) } else { args.chunk };
    for (index, piece) in bytes.chunks(chunk).enumerate() {
        let events = decoder
            .feed_events(piece)
            .with_context(|| format!("decoder gave up at chunk {index} of {}", args.file.display()))?;
        for event in &events {
            print_event(event, args.json, show_rejections)?;
        }
    }

    print_summary(decoder.stats(), decoder.buffered_len(), args.json)
}

fn print_event(event: &DecoderEvent, json: bool, show_rejections: bool) -> Result<()> {
    match event {
        DecoderEvent::Frame(frame) => {
            if json {
                emit_json(&JsonLine::Frame {
                    version: frame.version,
                    length: frame.payload.len(),
                    payload_hex: hex::encode(&frame.payload),
                })?;
            } else {
                println!(
                    "frame     v{:<2} len {:<6} {}{}",
                    frame.version,
                    frame.payload.len(),
                    spaced_hex_truncated(&frame.payload, PREVIEW_BYTES),
                    text_preview(&frame.payload)
                );
            }
        }
        DecoderEvent::Rejected(rejection) if show_rejections => {
            if json {
                emit_json(&JsonLine::Rejected {
                    offset: rejection.offset,
                    kind: rejection.reason.kind(),
                    reason: rejection.reason.to_string(),
                })?;
            } else {
                println!(
                    "rejected  @{:<4} {}  {}",
                    rejection.offset,
                    rejection.reason.kind(),
                    rejection.reason
                );
            }
        }
        DecoderEvent::Rejected(_) => {}
    }
    Ok(())
}

fn print_summary(stats: &DecoderStats, pending: usize, json: bool) -> Result<()> {
    if json {
        return emit_json(&JsonLine::Summary {
            frames: stats.frames,
            payload_bytes: stats.payload_bytes,
            rejected: stats.rejected(),
            noise_bytes: stats.noise_bytes,
            pending_bytes: pending,
        });
    }

    println!();
    println!("Frames:    {} ({} payload bytes)", stats.frames, stats.payload_bytes);
    println!("Rejected:  {}", stats.rejected());
    for (label, count) in [
        ("start marker", stats.invalid_marker),
        ("checksum", stats.invalid_checksum),
        ("end marker", stats.invalid_end_marker),
        ("version", stats.unsupported_version),
        ("length", stats.length_too_large),
    ] {
        if count > 0 {
            println!("  {label:<12} {count}");
        }
    }
    println!("Noise:     {} bytes", stats.noise_bytes);
    println!("Pending:   {pending} bytes");
    Ok(())
}

fn emit_json(line: &JsonLine<'_>) -> Result<()> {
    let text = serde_json::to_string(line).context("cannot serialise event")?;
    println!("{text}");
    Ok(())
}

/// `  "Hello"` when the payload is printable ASCII, empty otherwise.
fn text_preview(payload: &[u8]) -> String {
    if payload.is_empty() || payload.len() > PREVIEW_BYTES {
        return String::new();
    }
    if payload.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        format!("  {:?}", String::from_utf8_lossy(payload))
    } else {
        String::new()
    }
}
