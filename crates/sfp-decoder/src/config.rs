use sfp_wire::checksum::ChecksumAlgorithm;
use sfp_wire::error::WireError;
use sfp_wire::frame::FrameHeader;

/// Default bound on pending receive bytes (1 MiB).
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Configuration for a [`StreamDecoder`](crate::StreamDecoder).
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────────┐
/// │ Field            │ Purpose                                          │
/// ├──────────────────┼──────────────────────────────────────────────────┤
/// │ max_buffer_size  │ Flood guard: bytes allowed without a completed   │
/// │                  │ frame before the decoder gives up with           │
/// │                  │ BufferOverflow                                   │
/// │ checksum         │ Algorithm frames are validated with              │
/// │ accepted_version │ Optional version filter, checked at the header   │
/// │ max_payload_len  │ Declared lengths above this are refused before   │
/// │                  │ the body is buffered                             │
/// └──────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// The defaults accept every frame the wire format can express: any
/// version, any length up to 65535, CRC-16/CCITT-FALSE. Header policy
/// violations are per-frame rejections like a bad checksum; they drop one
/// byte and rescan instead of failing the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub max_buffer_size: usize,
    pub checksum: ChecksumAlgorithm,
    pub accepted_version: Option<u8>,
    pub max_payload_len: u16,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            checksum: ChecksumAlgorithm::default(),
            accepted_version: None,
            max_payload_len: u16::MAX,
        }
    }
}

impl DecoderConfig {
    /// A receiver that only takes one version and caps the payload size.
    ///
    /// This is how a reference receiver for a single application is usually
    /// run: `DecoderConfig::strict(0x01, 4096)`.
    pub fn strict(version: u8, max_payload_len: u16) -> Self {
        Self {
            accepted_version: Some(version),
            max_payload_len,
            ..Self::default()
        }
    }

    /// Apply the header policy to a freshly parsed header.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnsupportedVersion`] when a version filter is set and
    ///   the header carries another version.
    /// - [`WireError::LengthTooLarge`] when the declared length exceeds
    ///   `max_payload_len`.
    pub fn check_header(&self, header: FrameHeader) -> Result<(), WireError> {
        if let Some(expected) = self.accepted_version
            && header.version != expected
        {
            return Err(WireError::UnsupportedVersion {
                version: header.version,
                expected,
            });
        }

        if header.length > self.max_payload_len {
            return Err(WireError::LengthTooLarge {
                length: header.length,
                limit: self.max_payload_len,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_everything_on_the_wire() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_buffer_size, 1024 * 1024);
        assert!(config.check_header(FrameHeader::new(0x00, 0)).is_ok());
        assert!(config.check_header(FrameHeader::new(0xFF, u16::MAX)).is_ok());
    }

    #[test]
    fn strict_filters_version() {
        let config = DecoderConfig::strict(0x01, 4096);
        assert_eq!(
            config.check_header(FrameHeader::new(0x02, 10)),
            Err(WireError::UnsupportedVersion {
                version: 0x02,
                expected: 0x01
            })
        );
        assert!(config.check_header(FrameHeader::new(0x01, 10)).is_ok());
    }

    #[test]
    fn strict_caps_length() {
        let config = DecoderConfig::strict(0x01, 4096);
        assert!(config.check_header(FrameHeader::new(0x01, 4096)).is_ok());
        assert_eq!(
            config.check_header(FrameHeader::new(0x01, 4097)),
            Err(WireError::LengthTooLarge {
                length: 4097,
                limit: 4096
            })
        );
    }
}
