use binchain_types::TypeError;
use binchain_wire::WireError;

/// Errors that abort a parse.
///
/// Running out of bytes is never one of them: buffer mode truncates and
/// stream mode waits (or stalls once the source has ended, see
/// [`StreamState::Stalled`](crate::StreamState::Stalled)).
///
/// Error hierarchy:
///
/// ```text
///   ParseError
///   ├── Type(TypeError)    ← unknown variable, non-numeric or bad length
///   ├── Wire(WireError)    ← accumulator asked for bytes it does not hold
///   ├── PatternNotFound    ← `find` gave up
///   └── Io(std::io::Error) ← from the AsyncRead driver
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Wire(#[from] WireError),

    /// `find` skipped more than `limit` bytes without a match, or (buffer
    /// mode) reached the end of the region.
    #[error("pattern {pattern:02X?} not found within {scanned} bytes")]
    PatternNotFound { pattern: Vec<u8>, scanned: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
