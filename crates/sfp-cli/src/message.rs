//! Application messages carried in frame payloads by `probe` and `listen`.
//!
//! The frame layer treats payloads as opaque; these layouts belong to the
//! reference client/server pair only.
//!
//! ```text
//! Request  type u8 | message_id u16 BE | body ...
//! Ack      status u8 | timestamp_ms u64 BE | command u8 | [interval_ms u32 BE]
//!                                             └─ 0x01 = set interval, 0x00 = none
//! ```

use anyhow::{Result, bail};

/// Size of a request without its body.
pub const REQUEST_HEADER_LEN: usize = 3;

/// Ack size when no interval command is attached.
pub const ACK_MIN_LEN: usize = 10;

const COMMAND_NONE: u8 = 0x00;
const COMMAND_SET_INTERVAL: u8 = 0x01;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub kind: u8,
    pub message_id: u16,
    pub body: Vec<u8>,
}

impl Request {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(REQUEST_HEADER_LEN + self.body.len());
        out.push(self.kind);
        out.extend_from_slice(&self.message_id.to_be_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < REQUEST_HEADER_LEN {
            bail!("request too short: {} bytes", payload.len());
        }
        Ok(Self {
            kind: payload[0],
            message_id: u16::from_be_bytes([payload[1], payload[2]]),
            body: payload[REQUEST_HEADER_LEN..].to_vec(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
    pub timestamp_ms: u64,
    /// Interval the sender should switch to, if the receiver asks for one.
    pub interval_ms: Option<u32>,
}

impl Ack {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ACK_MIN_LEN + 4);
        out.push(u8::from(!self.ok));
        out.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        match self.interval_ms {
            Some(interval) => {
                out.push(COMMAND_SET_INTERVAL);
                out.extend_from_slice(&interval.to_be_bytes());
            }
            None => out.push(COMMAND_NONE),
        }
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < ACK_MIN_LEN {
            bail!("ack too short: {} bytes", payload.len());
        }
        let ok = match payload[0] {
            0x00 => true,
            0x01 => false,
            other => bail!("unknown ack status 0x{other:02X}"),
        };
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&payload[1..9]);

        let interval_ms = match payload[9] {
            COMMAND_NONE => None,
            COMMAND_SET_INTERVAL => {
                let Some(raw) = payload.get(ACK_MIN_LEN..ACK_MIN_LEN + 4) else {
                    bail!("ack interval command without a value");
                };
                Some(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            other => bail!("unknown ack command 0x{other:02X}"),
        };

        Ok(Self {
            ok,
            timestamp_ms: u64::from_be_bytes(ts),
            interval_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout() {
        let req = Request {
            kind: 0x01,
            message_id: 1234,
            body: b"hi".to_vec(),
        };
        let bytes = req.to_bytes();
        assert_eq!(bytes, vec![0x01, 0x04, 0xD2, b'h', b'i']);
        assert_eq!(Request::parse(&bytes).unwrap(), req);
        assert!(Request::parse(&[0x01, 0x00]).is_err());
    }

    #[test]
    fn ack_without_interval() {
        let ack = Ack {
            ok: true,
            timestamp_ms: 0x0102_0304_0506_0708,
            interval_ms: None,
        };
        let bytes = ack.to_bytes();
        assert_eq!(bytes, vec![0x00, 1, 2, 3, 4, 5, 6, 7, 8, 0x00]);
        assert_eq!(Ack::parse(&bytes).unwrap(), ack);
    }

    #[test]
    fn ack_with_interval() {
        let ack = Ack {
            ok: false,
            timestamp_ms: 42,
            interval_ms: Some(1500),
        };
        let bytes = ack.to_bytes();
        assert_eq!(bytes.len(), 14);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[10..], &1500u32.to_be_bytes());
        assert_eq!(Ack::parse(&bytes).unwrap(), ack);
    }

    #[test]
    fn ack_rejects_bad_input() {
        assert!(Ack::parse(&[0x00; 9]).is_err());
        let mut bad_status = vec![0x07];
        bad_status.extend([0u8; 9]);
        assert!(Ack::parse(&bad_status).is_err());

        let mut missing_interval = vec![0x00];
        missing_interval.extend([0u8; 8]);
        missing_interval.push(0x01);
        assert!(Ack::parse(&missing_interval).is_err());
    }
}
