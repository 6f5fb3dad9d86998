/// Errors raised by the wire layer.
///
/// Word decoding is total (any slice decodes to a number), so the only
/// failures here come from violating the accumulator contract: asking for
/// more bytes than are ready.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A slice or seek asked for more bytes than the accumulator holds.
    #[error("requested {requested} bytes but only {ready} are ready")]
    InsufficientData { requested: usize, ready: usize },
}
