/// Implementation of `sfp crc`.
///
/// Two peers that disagree on the checksum algorithm reject each other's
/// every frame with `checksum mismatch`. This command shows what each
/// candidate algorithm produces so the mismatch can be spotted by eye.
///
/// # Build mode
///
/// ```text
/// $ sfp crc --text Hello
/// Checksum input:      01 00 05 48 65 6C 6C 6F  (version | length | payload)
///
/// CRC-16/CCITT-FALSE   0xFE3A   AA 01 00 05 48 65 6C 6C 6F FE 3A 55   (wire default)
/// CRC-16/MODBUS        0x61D2   AA 01 00 05 48 65 6C 6C 6F 61 D2 55
/// ```
///
/// # Diagnose mode
///
/// `--frame "<hex>"` takes a captured frame, recomputes every algorithm
/// over its `version | length | payload` span and reports which one
/// produced the checksum the frame carries.
use anyhow::{Result, bail};
use sfp_encoder::FrameEncoder;
use sfp_wire::ChecksumAlgorithm;
use sfp_wire::frame::{FRAME_OVERHEAD, FrameHeader, HEADER_SIZE, START_MARKER};

use crate::CrcArgs;
use crate::payload::{parse_hex, spaced_hex, spaced_hex_truncated};

/// Frame bytes printed per candidate line.
const FRAME_PREVIEW: usize = 32;

/// Run the `sfp crc` command.
///
/// # Errors
///
/// Returns an error if no input is given, the payload does not fit in a
/// frame, or `--frame` is not a well-formed frame.
pub fn run(args: &CrcArgs) -> Result<()> {
    if let Some(frame) = &args.frame {
        return diagnose(&parse_hex(frame)?);
    }
    let Some(payload) = args.input.read()? else {
        bail!("give a payload (--text, --hex, --file) or a captured --frame");
    };
    compare(args.frame_version, &payload)
}

fn compare(version: u8, payload: &[u8]) -> Result<()> {
    let Ok(length) = u16::try_from(payload.len()) else {
        bail!("payload of {} bytes does not fit in a frame", payload.len());
    };
    let mut input = Vec::with_capacity(HEADER_SIZE - 1 + payload.len());
    input.push(version);
    input.extend_from_slice(&length.to_be_bytes());
    input.extend_from_slice(payload);

    println!(
        "Checksum input:      {}  (version | length | payload)",
        spaced_hex_truncated(&input, FRAME_PREVIEW)
    );
    println!();

    for algorithm in ChecksumAlgorithm::ALL {
        let frame = FrameEncoder::new()
            .version(version)
            .checksum(algorithm)
            .encode(payload)?;
        let note = if algorithm == ChecksumAlgorithm::default() {
            "   (wire default)"
        } else {
            ""
        };
        println!(
            "{:<20} {:#06X}   {}{note}",
            algorithm.name(),
            algorithm.compute(&input),
            spaced_hex_truncated(&frame, FRAME_PREVIEW)
        );
    }

    Ok(())
}

fn diagnose(frame: &[u8]) -> Result<()> {
    let Some(covered) = covered_span(frame) else {
        bail!(
            "not a complete frame ({} bytes): need AA, a length matching the size, and a trailer",
            frame.len()
        );
    };
    let carried = carried_checksum(frame, covered);

    println!("Frame:    {}", spaced_hex(frame));
    println!("Carries:  {carried:#06X}");
    println!();

    for algorithm in ChecksumAlgorithm::ALL {
        let computed = algorithm.compute(covered);
        let verdict = if computed == carried { "match" } else { "no match" };
        println!("{:<20} {computed:#06X}   {verdict}", algorithm.name());
    }

    println!();
    match matching_algorithm(frame) {
        Some(algorithm) if algorithm == ChecksumAlgorithm::default() => {
            println!("Sender uses the wire default.");
        }
        Some(algorithm) => println!(
            "Sender uses {}; receivers on the wire default will reject its frames.",
            algorithm.name()
        ),
        None => println!("No known algorithm matches; the frame is corrupt or uses another variant."),
    }
    Ok(())
}

/// First algorithm that reproduces the checksum a complete frame carries.
fn matching_algorithm(frame: &[u8]) -> Option<ChecksumAlgorithm> {
    let covered = covered_span(frame)?;
    let carried = carried_checksum(frame, covered);
    ChecksumAlgorithm::ALL
        .into_iter()
        .find(|algorithm| algorithm.compute(covered) == carried)
}

fn carried_checksum(frame: &[u8], covered: &[u8]) -> u16 {
    let at = 1 + covered.len();
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

/// The checksummed span of a complete frame, `version | length | payload`.
fn covered_span(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < FRAME_OVERHEAD || frame[0] != START_MARKER {
        return None;
    }
    let header = FrameHeader::new(frame[1], u16::from_be_bytes([frame[2], frame[3]]));
    if header.frame_len() != frame.len() {
        return None;
    }
    Some(&frame[1..HEADER_SIZE + usize::from(header.length)])
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: [u8; 12] = [0xAA, 0x01, 0x00, 0x05, 0x48, 0x65, 0x6C, 0x6C, 0x6F, 0xFE, 0x3A, 0x55];

    #[test]
    fn covered_span_is_version_through_payload() {
        assert_eq!(covered_span(&HELLO), Some(&HELLO[1..9]));
    }

    #[test]
    fn covered_span_refuses_partial_frames() {
        assert_eq!(covered_span(&HELLO[..11]), None);
        assert_eq!(covered_span(&[0xBB; 12]), None);
    }

    #[test]
    fn matching_algorithm_names_the_sender() {
        assert_eq!(matching_algorithm(&HELLO), Some(ChecksumAlgorithm::CcittFalse));

        let mut modbus = HELLO;
        modbus[9] = 0x61;
        modbus[10] = 0xD2;
        assert_eq!(matching_algorithm(&modbus), Some(ChecksumAlgorithm::Modbus));

        let mut neither = HELLO;
        neither[10] = 0x00;
        assert_eq!(matching_algorithm(&neither), None);
        assert_eq!(matching_algorithm(&HELLO[..5]), None);
    }

    #[test]
    fn diagnose_needs_a_complete_frame() {
        assert!(diagnose(&HELLO).is_ok());
        assert!(diagnose(&HELLO[..5]).is_err());
    }
}
