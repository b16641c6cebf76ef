#![warn(clippy::pedantic)]

pub mod checksum;
pub mod error;
pub mod frame;

pub use checksum::{ChecksumAlgorithm, checksum};
pub use error::WireError;
pub use frame::{Frame, FrameHeader};
