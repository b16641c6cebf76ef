#![warn(clippy::pedantic)]

pub mod corrupt;
pub mod encoder;
pub mod error;

pub use corrupt::Corruption;
pub use encoder::{FrameEncoder, encode};
pub use error::EncodeError;
