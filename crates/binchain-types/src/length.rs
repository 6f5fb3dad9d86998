use std::fmt;

use crate::error::TypeError;
use crate::vars::Vars;

/// Byte count for `buffer` and `skip`: a literal, or the name of a number
/// captured earlier in the parse.
///
/// The name is resolved when the operation runs, not when it is declared,
/// so `buffer("body", "len")` after `word16le("len")` reads whatever
/// length the stream actually carried.
///
/// ```rust
/// use binchain_types::{Len, Vars};
///
/// let mut vars = Vars::new();
/// vars.set("len", 3.0);
/// assert_eq!(Len::from(8).resolve(&vars).unwrap(), 8);
/// assert_eq!(Len::from("len").resolve(&vars).unwrap(), 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Len {
    Bytes(usize),
    Var(String),
}

impl Len {
    /// Resolve to a concrete byte count.
    ///
    /// # Errors
    ///
    /// - [`TypeError::UnknownVariable`] if the named variable is unset.
    /// - [`TypeError::NotANumber`] if it holds bytes.
    /// - [`TypeError::InvalidLength`] if it is negative, fractional, or
    ///   not finite.
    pub fn resolve(&self, vars: &Vars) -> Result<usize, TypeError> {
        match self {
            Len::Bytes(n) => Ok(*n),
            Len::Var(name) => {
                let value = vars.get_number(name)?;
                if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
                    return Err(TypeError::InvalidLength {
                        name: name.clone(),
                        value,
                    });
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = value as usize;
                Ok(n)
            }
        }
    }
}

impl From<usize> for Len {
    fn from(n: usize) -> Self {
        Len::Bytes(n)
    }
}

impl From<&str> for Len {
    fn from(name: &str) -> Self {
        Len::Var(name.to_string())
    }
}

impl From<String> for Len {
    fn from(name: String) -> Self {
        Len::Var(name)
    }
}

impl fmt::Display for Len {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Len::Bytes(n) => write!(f, "{n}"),
            Len::Var(name) => f.write_str(name),
        }
    }
}
