#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod reader;
pub mod stats;
pub mod stream;

pub use config::{DEFAULT_MAX_BUFFER_SIZE, DecoderConfig};
pub use error::DecodeError;
pub use reader::FrameReader;
pub use stats::DecoderStats;
pub use stream::{DecoderEvent, DecoderState, Rejection, StreamDecoder};
