#![warn(clippy::pedantic)]

pub mod accumulator;
pub mod error;
pub mod word;

pub use accumulator::ByteAccumulator;
pub use error::WireError;
pub use word::{Endian, Signedness, Width, WordOp};
