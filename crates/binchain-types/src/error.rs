/// Errors raised when reading named values back out of a [`Vars`] store.
///
/// These are the only failures a layout itself can produce: everything
/// else in a parse is either a truncated read (buffer mode) or a wait for
/// more data (stream mode).
///
/// ```text
/// ┌─────────────────┬───────────────────────────────────────────────┐
/// │ Variant         │ Cause                                         │
/// ├─────────────────┼───────────────────────────────────────────────┤
/// │ UnknownVariable │ name was never set, or was dropped by flush   │
/// │ NotANumber      │ a byte-slice value used where a count is due  │
/// │ InvalidLength   │ negative, fractional or non-finite count      │
/// └─────────────────┴───────────────────────────────────────────────┘
/// ```
///
/// [`Vars`]: crate::Vars
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    /// A length argument named a variable holding raw bytes.
    #[error("variable {name} holds bytes, expected a number")]
    NotANumber { name: String },

    /// A length argument named a number that is not a byte count.
    #[error("variable {name} = {value} is not a valid byte count")]
    InvalidLength { name: String, value: f64 },
}
