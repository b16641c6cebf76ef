#![no_main]

use libfuzzer_sys::fuzz_target;
use sfp_decoder::StreamDecoder;
use sfp_encoder::encode;
use sfp_wire::Frame;

// Fuzz target: encode→decode roundtrip through both decode paths.
//
// Input format:
//   byte 0: version
//   bytes 1..: payload
fuzz_target!(|data: &[u8]| {
    let Some((&version, payload)) = data.split_first() else {
        return;
    };

    let wire = encode(version, payload).unwrap();
    let (frame, consumed) = Frame::decode(&wire).unwrap();
    assert_eq!(consumed, wire.len());
    assert_eq!(frame.version, version);
    assert_eq!(&frame.payload[..], payload);

    let frames = StreamDecoder::new().feed(&wire).unwrap();
    assert_eq!(frames, vec![frame]);
});
