use sfp_wire::WireError;

/// Running counters for one decoder instance.
///
/// Counters survive [`StreamDecoder::reset`](crate::StreamDecoder::reset);
/// they describe the connection, not the current buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames emitted.
    pub frames: u64,
    /// Payload bytes carried by emitted frames.
    pub payload_bytes: u64,
    /// Bytes dropped while scanning because no start marker was present.
    pub noise_bytes: u64,
    pub invalid_marker: u64,
    pub invalid_checksum: u64,
    pub invalid_end_marker: u64,
    pub unsupported_version: u64,
    pub length_too_large: u64,
    /// Times the flood guard fired.
    pub overflows: u64,
}

impl DecoderStats {
    /// Total candidates rejected for any reason.
    pub fn rejected(&self) -> u64 {
        self.invalid_marker
            + self.invalid_checksum
            + self.invalid_end_marker
            + self.unsupported_version
            + self.length_too_large
    }

    pub(crate) fn record_rejection(&mut self, reason: &WireError) {
        let counter = match reason {
            WireError::InvalidMarker { .. } => &mut self.invalid_marker,
            WireError::InvalidChecksum { .. } => &mut self.invalid_checksum,
            WireError::InvalidEndMarker { .. } => &mut self.invalid_end_marker,
            WireError::UnsupportedVersion { .. } => &mut self.unsupported_version,
            WireError::LengthTooLarge { .. } => &mut self.length_too_large,
            // one-shot decode only, the stream decoder never rejects with it
            WireError::UnexpectedEof { .. } => return,
        };
        *counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_sums_every_kind() {
        let mut stats = DecoderStats::default();
        stats.record_rejection(&WireError::InvalidMarker {
            offset: 0,
            found: 0,
        });
        stats.record_rejection(&WireError::InvalidChecksum {
            computed: 1,
            found: 2,
        });
        stats.record_rejection(&WireError::InvalidEndMarker { found: 0 });
        stats.record_rejection(&WireError::LengthTooLarge {
            length: 10,
            limit: 5,
        });
        stats.record_rejection(&WireError::UnexpectedEof { offset: 0 });
        assert_eq!(stats.rejected(), 4);
        assert_eq!(stats.invalid_checksum, 1);
        assert_eq!(stats.unsupported_version, 0);
    }
}
