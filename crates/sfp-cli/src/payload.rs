//! Payload sources and hex formatting shared by the commands.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Exactly one payload source.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
pub struct PayloadInput {
    /// Payload as UTF-8 text.
    #[arg(long)]
    pub text: Option<String>,

    /// Payload as hex; whitespace is ignored (`"48 65 6C"`).
    #[arg(long)]
    pub hex: Option<String>,

    /// Payload read from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl PayloadInput {
    pub fn read(&self) -> Result<Vec<u8>> {
        read_source(self.text.as_deref(), self.hex.as_deref(), self.file.as_ref())?
            .context("no payload given")
    }
}

/// At most one payload source, for commands with another input mode.
#[derive(clap::Args)]
#[group(required = false, multiple = false)]
pub struct OptionalPayloadInput {
    /// Payload as UTF-8 text.
    #[arg(long)]
    pub text: Option<String>,

    /// Payload as hex; whitespace is ignored.
    #[arg(long)]
    pub hex: Option<String>,

    /// Payload read from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl OptionalPayloadInput {
    pub fn read(&self) -> Result<Option<Vec<u8>>> {
        read_source(self.text.as_deref(), self.hex.as_deref(), self.file.as_ref())
    }
}

fn read_source(text: Option<&str>, hex: Option<&str>, file: Option<&PathBuf>) -> Result<Option<Vec<u8>>> {
    if let Some(text) = text {
        return Ok(Some(text.as_bytes().to_vec()));
    }
    if let Some(hex) = hex {
        return parse_hex(hex).map(Some);
    }
    if let Some(path) = file {
        let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        return Ok(Some(bytes));
    }
    Ok(None)
}

/// Parse hex with optional whitespace and an optional `0x` prefix per token.
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: String = s
        .split_whitespace()
        .map(|token| token.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits ({})", digits.len());
    }
    hex::decode(&digits).with_context(|| format!("invalid hex {s:?}"))
}

/// Uppercase, space separated: `AA 01 00 05`.
pub fn spaced_hex(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, chunk) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(char::from(chunk[0]));
        out.push(char::from(chunk[1]));
    }
    out
}

/// Like [`spaced_hex`] but cut after `limit` bytes with a trailing marker.
pub fn spaced_hex_truncated(bytes: &[u8], limit: usize) -> String {
    if bytes.len() <= limit {
        return spaced_hex(bytes);
    }
    format!("{} ... ({} bytes)", spaced_hex(&bytes[..limit]), bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_spaces_and_prefixes() {
        assert_eq!(parse_hex("AA 01 00 05").unwrap(), vec![0xAA, 0x01, 0x00, 0x05]);
        assert_eq!(parse_hex("0xaa 0x55").unwrap(), vec![0xAA, 0x55]);
        assert_eq!(parse_hex("48656c6c6f").unwrap(), b"Hello".to_vec());
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(parse_hex("ABC").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn spaced_output() {
        assert_eq!(spaced_hex(&[0xAA, 0x01, 0xFE]), "AA 01 FE");
        assert_eq!(spaced_hex(&[]), "");
        assert_eq!(spaced_hex_truncated(&[1, 2, 3, 4], 2), "01 02 ... (4 bytes)");
    }

    #[test]
    fn text_wins_when_set() {
        let input = PayloadInput {
            text: Some("Hello".into()),
            hex: None,
            file: None,
        };
        assert_eq!(input.read().unwrap(), b"Hello");

        let none = OptionalPayloadInput {
            text: None,
            hex: None,
            file: None,
        };
        assert!(none.read().unwrap().is_none());
    }
}
