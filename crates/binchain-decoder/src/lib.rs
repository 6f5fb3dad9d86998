#![warn(clippy::pedantic)]

#[macro_use]
mod macros;

pub mod buffer;
pub mod config;
pub mod error;
pub mod find;
pub mod streaming;
pub mod terminator;

pub use binchain_types::{Len, Value, Vars};
pub use binchain_wire::WordOp;
pub use buffer::BufferParser;
pub use config::ParserConfig;
pub use error::ParseError;
pub use streaming::{Chain, PendingRead, SourceEvent, StreamParser, StreamState};
pub use terminator::Terminator;

/// Parse a complete in-memory region.
///
/// Equivalent to [`BufferParser::new`].
pub fn parse(bytes: impl Into<bytes::Bytes>) -> BufferParser {
    BufferParser::new(bytes)
}

/// Start a stream parse listening for `"data"` events.
///
/// Equivalent to [`StreamParser::new`]; use
/// [`StreamParser::with_event`] for a different event name.
#[must_use]
pub fn stream() -> StreamParser {
    StreamParser::new()
}
