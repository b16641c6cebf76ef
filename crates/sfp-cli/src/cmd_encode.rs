/// Implementation of `sfp encode`.
///
/// Wraps one payload into a frame. Without `-o` the frame is printed as
/// spaced hex on stdout, ready to paste into `sfp decode` captures or a
/// serial terminal; with `-o` the raw bytes are written to the file.
///
/// # Example
///
/// ```text
/// $ sfp encode --text Hello
/// AA 01 00 05 48 65 6C 6C 6F FE 3A 55
/// ```
use std::fs;

use anyhow::{Context, Result};
use sfp_encoder::FrameEncoder;

use crate::EncodeArgs;
use crate::payload::spaced_hex;

/// Run the `sfp encode` command.
///
/// # Errors
///
/// Returns an error if the payload cannot be read, is longer than 65535
/// bytes, or the output file cannot be written.
pub fn run(args: &EncodeArgs) -> Result<()> {
    let payload = args.input.read()?;

    let frame = FrameEncoder::new()
        .version(args.frame_version)
        .checksum(args.checksum.into())
        .encode(&payload)
        .context("cannot encode payload")?;

    if let Some(path) = &args.output {
        fs::write(path, &frame).with_context(|| format!("cannot write {}", path.display()))?;
        eprintln!("wrote {} bytes to {}", frame.len(), path.display());
    } else {
        println!("{}", spaced_hex(&frame));
    }

    Ok(())
}
