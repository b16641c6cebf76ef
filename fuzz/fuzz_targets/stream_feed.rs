#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sfp_decoder::{DecoderConfig, StreamDecoder};

// Fuzz target: StreamDecoder over arbitrary chunked input.
//
// Input format (via arbitrary):
//   strict: whether to apply the header policy
//   max_buffer: buffer bound, clamped to at least 8
//   chunks: the pieces handed to feed, in order
//
// Checks that the decoder never panics, never holds more than its bound,
// and that a successful feed returns every frame it counted.
#[derive(Arbitrary, Debug)]
struct Input {
    strict: bool,
    max_buffer: u16,
    chunks: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let mut config = if input.strict {
        DecoderConfig::strict(0x01, 1024)
    } else {
        DecoderConfig::default()
    };
    config.max_buffer_size = usize::from(input.max_buffer).max(8);

    let mut decoder = StreamDecoder::with_config(config);
    for chunk in &input.chunks {
        let before = decoder.stats().frames;
        if let Ok(out) = decoder.feed(chunk) {
            assert_eq!(decoder.stats().frames - before, out.len() as u64);
        }
        assert!(decoder.buffered_len() <= config.max_buffer_size);
    }
});
