//! Golden capture generator for the SFP conformance suite.
//!
//! Writes every fixture under `tests/golden/`. Each fixture is a raw byte
//! capture, exactly what a receiver would read off the wire, so the same
//! files work with `sfp decode` for manual inspection.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_golden -p sfp-tests
//! sfp decode crates/sfp-tests/tests/golden/noisy/capture.bin --show-rejections
//! ```
//!
//! # Generated fixtures
//!
//! | Directory  | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | hello      | The reference frame: version 1, payload "Hello"              |
//! | pipelined  | Three frames back to back                                    |
//! | noisy      | Noise, valid frames, bad end marker, bad checksum, bad start |
//! | truncated  | One frame followed by the first half of another              |
//! | modbus     | "Hello" protected with CRC-16/MODBUS instead of the default  |

#![allow(clippy::pedantic)]

use std::path::Path;

use sfp_encoder::{Corruption, FrameEncoder, encode};
use sfp_wire::ChecksumAlgorithm;

fn main() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let golden_dir = manifest_dir.join("tests/golden");

    generate_hello(&golden_dir);
    generate_pipelined(&golden_dir);
    generate_noisy(&golden_dir);
    generate_truncated(&golden_dir);
    generate_modbus(&golden_dir);

    println!("golden captures written to {}", golden_dir.display());
}

fn write_capture(dir: &Path, name: &str, bytes: &[u8]) {
    let fixture_dir = dir.join(name);
    std::fs::create_dir_all(&fixture_dir).unwrap();
    let path = fixture_dir.join("capture.bin");
    std::fs::write(&path, bytes).unwrap();
    println!("  {name:<10} {:>4} bytes  {}", bytes.len(), hex::encode(bytes));
}

fn frame(payload: &[u8]) -> Vec<u8> {
    encode(0x01, payload).unwrap()
}

fn generate_hello(dir: &Path) {
    write_capture(dir, "hello", &frame(b"Hello"));
}

fn generate_pipelined(dir: &Path) {
    let mut capture = Vec::new();
    for payload in [&b"first"[..], b"second", b"third"] {
        capture.extend(frame(payload));
    }
    write_capture(dir, "pipelined", &capture);
}

fn generate_noisy(dir: &Path) {
    let mut capture = vec![0x00, 0x13, 0x37, 0x55];
    capture.extend(frame(b"Hello"));
    capture.extend(
        Corruption::EndMarker(0x66)
            .applied_to(&frame(b"Test End Marker"))
            .unwrap(),
    );
    capture.extend(
        Corruption::Checksum(0x1234)
            .applied_to(&frame(b"Wrong CRC Test"))
            .unwrap(),
    );
    capture.extend(frame(b"good"));
    capture.extend(
        Corruption::StartMarker(0xBB)
            .applied_to(&frame(b"Hello Server"))
            .unwrap(),
    );
    capture.extend(frame(b"after"));
    write_capture(dir, "noisy", &capture);
}

fn generate_truncated(dir: &Path) {
    let mut capture = frame(b"one");
    let cut = frame(b"Truncated Frame");
    capture.extend(Corruption::Truncate(cut.len() / 2).applied_to(&cut).unwrap());
    write_capture(dir, "truncated", &capture);
}

fn generate_modbus(dir: &Path) {
    let capture = FrameEncoder::new()
        .checksum(ChecksumAlgorithm::Modbus)
        .encode(b"Hello")
        .unwrap();
    write_capture(dir, "modbus", &capture);
}
