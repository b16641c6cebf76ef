#![no_main]

use libfuzzer_sys::fuzz_target;
use sfp_wire::frame::{decode_frame, decode_header};
use sfp_wire::{ChecksumAlgorithm, Frame};

// Fuzz target: header and candidate parsing at offset 0.
//
// Catches bugs in:
// - Short buffers (fewer than 4 header bytes)
// - Declared lengths past the end of the buffer
// - Slicing of the checksum and end marker
fuzz_target!(|data: &[u8]| {
    if let Ok(Some(header)) = decode_header(data, 0) {
        for algorithm in ChecksumAlgorithm::ALL {
            let _ = decode_frame(data, 0, header, algorithm);
        }
    }
    if let Ok((frame, consumed)) = Frame::decode(data) {
        assert_eq!(consumed, frame.encoded_len());
        assert!(consumed <= data.len());
    }
});
