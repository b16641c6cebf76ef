//! 16-bit frame checksum.
//!
//! The wire contract is CRC-16/CCITT-FALSE: MSB-first, polynomial `0x1021`,
//! initial value `0xFFFF`, no reflection, no final XOR. It covers
//! `version ‖ length ‖ payload`, i.e. everything between the start marker
//! and the checksum field.
//!
//! CRC-16/MODBUS (LSB-first, reflected polynomial `0xA001`, same initial
//! value) is kept as a diagnostic alternative. It produces different values
//! for the same input, so a receiver and a sender must agree on one
//! [`ChecksumAlgorithm`] up front.

/// Polynomial for the MSB-first (left-shifting) CCITT variant.
pub const CCITT_POLY: u16 = 0x1021;

/// Bit-reversed polynomial for the LSB-first (right-shifting) MODBUS variant.
pub const MODBUS_POLY: u16 = 0xA001;

/// Initial register value shared by both variants.
pub const INITIAL: u16 = 0xFFFF;

/// Checksum algorithms a frame may be protected with.
///
/// ```text
/// ┌────────────┬───────────┬────────┬────────┬──────────────────────┐
/// │ Variant    │ Direction │ Poly   │ Init   │ check("123456789")   │
/// ├────────────┼───────────┼────────┼────────┼──────────────────────┤
/// │ CcittFalse │ MSB-first │ 0x1021 │ 0xFFFF │ 0x29B1 (wire default)│
/// │ Modbus     │ LSB-first │ 0xA001 │ 0xFFFF │ 0x4B37               │
/// └────────────┴───────────┴────────┴────────┴──────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// CRC-16/CCITT-FALSE. The pinned wire contract.
    #[default]
    CcittFalse,
    /// CRC-16/MODBUS. Only for diagnosing counterparts that use it.
    Modbus,
}

impl ChecksumAlgorithm {
    /// Every supported algorithm, wire default first.
    pub const ALL: [Self; 2] = [Self::CcittFalse, Self::Modbus];

    /// Compute the checksum of `bytes` in one pass.
    pub fn compute(self, bytes: &[u8]) -> u16 {
        let mut digest = self.digest();
        digest.update(bytes);
        digest.finish()
    }

    /// Start an incremental computation.
    pub fn digest(self) -> Digest {
        Digest {
            algorithm: self,
            crc: INITIAL,
        }
    }

    /// Human-readable catalogue name.
    pub fn name(self) -> &'static str {
        match self {
            Self::CcittFalse => "CRC-16/CCITT-FALSE",
            Self::Modbus => "CRC-16/MODBUS",
        }
    }
}

/// Incremental checksum state.
///
/// Feeding the input in several `update` calls yields the same value as a
/// single [`ChecksumAlgorithm::compute`] over the concatenation, which lets
/// the encoder checksum the header and the payload without joining them.
#[derive(Clone, Copy, Debug)]
pub struct Digest {
    algorithm: ChecksumAlgorithm,
    crc: u16,
}

impl Digest {
    pub fn update(&mut self, bytes: &[u8]) {
        self.crc = match self.algorithm {
            ChecksumAlgorithm::CcittFalse => update_msb_first(self.crc, bytes),
            ChecksumAlgorithm::Modbus => update_lsb_first(self.crc, bytes),
        };
    }

    pub fn finish(self) -> u16 {
        self.crc
    }
}

/// Checksum with the pinned wire algorithm (CRC-16/CCITT-FALSE).
pub fn checksum(bytes: &[u8]) -> u16 {
    ChecksumAlgorithm::CcittFalse.compute(bytes)
}

fn update_msb_first(mut crc: u16, bytes: &[u8]) -> u16 {
    for &byte in bytes {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CCITT_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn update_lsb_first(mut crc: u16, bytes: &[u8]) -> u16 {
    for &byte in bytes {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ MODBUS_POLY
            } else {
                crc >> 1
            };
        }
    }
    crc
}

// Note on the 16-bit truncation: the register is a u16, so `crc << 1` simply
// drops bit 15 on the floor. That is exactly the "AND 0xFFFF after every step"
// a wider integer would need, which is why there is no explicit mask here.
// The high bit is tested *before* the shift so the carry decides whether the
// polynomial is folded in.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_initial_value() {
        assert_eq!(checksum(b""), 0xFFFF);
        assert_eq!(ChecksumAlgorithm::Modbus.compute(b""), 0xFFFF);
    }

    #[test]
    fn catalogue_check_values() {
        assert_eq!(ChecksumAlgorithm::CcittFalse.compute(b"123456789"), 0x29B1);
        assert_eq!(ChecksumAlgorithm::Modbus.compute(b"123456789"), 0x4B37);
    }

    #[test]
    fn hello_header_and_payload() {
        let input = [0x01, 0x00, 0x05, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(checksum(&input), 0xFE3A);
        assert_eq!(ChecksumAlgorithm::Modbus.compute(&input), 0x61D2);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = b"version, length and then the payload bytes";
        for algorithm in ChecksumAlgorithm::ALL {
            let mut digest = algorithm.digest();
            for chunk in data.chunks(5) {
                digest.update(chunk);
            }
            assert_eq!(digest.finish(), algorithm.compute(data), "{}", algorithm.name());
        }
    }

    #[test]
    fn algorithms_disagree() {
        let data = [0x01, 0x00, 0x00];
        assert_ne!(
            ChecksumAlgorithm::CcittFalse.compute(&data),
            ChecksumAlgorithm::Modbus.compute(&data)
        );
    }

    #[test]
    fn default_is_wire_contract() {
        assert_eq!(ChecksumAlgorithm::default(), ChecksumAlgorithm::CcittFalse);
    }
}
