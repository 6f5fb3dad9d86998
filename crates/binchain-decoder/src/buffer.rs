use binchain_types::{Len, Vars};
use binchain_wire::WordOp;
use bytes::Bytes;
use tracing::trace;

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::find::{self, Scan};
use crate::terminator::Terminator;

/// Synchronous parser over a complete in-memory region.
///
/// Every operation runs immediately against a cursor that only moves
/// forward. Reads near the end are clamped: a word or buffer that runs
/// past the region yields the bytes that are there (possibly none) and
/// the cursor stops at the end. That is not an error.
///
/// ```text
///   data:   01 00 05 68 65 6C 6C 6F
///           ├───┤ ├┤ ├────────────┤
///   word16le("tag")  word8("len")  buffer("body", "len")
///   cursor: 0 ─────► 2 ───────────► 3 ───────────────────► 8
/// ```
///
/// # Example
///
/// ```rust
/// use binchain_decoder::parse;
///
/// let mut parser = parse(&b"\x01\x00\x05hello"[..]);
/// parser
///     .word16le("tag")?
///     .word8("len")?
///     .buffer("body", "len")?;
///
/// assert_eq!(parser.vars().get_number("tag")?, 1.0);
/// assert_eq!(&parser.vars().get_bytes("body")?.unwrap()[..], b"hello");
/// # Ok::<(), binchain_decoder::ParseError>(())
/// ```
#[derive(Debug)]
pub struct BufferParser {
    data: Bytes,
    offset: usize,
    vars: Vars,
    config: ParserConfig,
}

impl BufferParser {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_config(data, ParserConfig::default())
    }

    pub fn with_config(data: impl Into<Bytes>, config: ParserConfig) -> Self {
        Self {
            data: data.into(),
            offset: 0,
            vars: Vars::new(),
            config,
        }
    }

    /// Current cursor position.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the region.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[must_use]
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars {
        &mut self.vars
    }

    #[must_use]
    pub fn into_vars(self) -> Vars {
        self.vars
    }

    /// Slice up to `n` bytes from the cursor and advance past them.
    fn read(&mut self, n: usize) -> Bytes {
        let end = self.offset.saturating_add(n).min(self.data.len());
        let out = self.data.slice(self.offset..end);
        self.offset = end;
        out
    }

    /// Read one word under `op` and store it under `name`.
    ///
    /// # Errors
    ///
    /// Infallible in practice; returns `Result` so it chains with the
    /// other operations.
    pub fn word(&mut self, name: impl Into<String>, op: WordOp) -> Result<&mut Self, ParseError> {
        let name = name.into();
        let bytes = self.read(op.size());
        let value = op.decode(&bytes);
        trace!(name = %name, op = op.name(), value, offset = self.offset, "word");
        self.vars.set(name, value);
        Ok(self)
    }

    word_methods!(Result<&mut Self, ParseError>);

    /// Store the next `len` bytes under `name`.
    ///
    /// `len` is a literal count or the name of a number read earlier.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Type`] if `len` names a variable that is
    /// unset or is not a byte count.
    pub fn buffer(
        &mut self,
        name: impl Into<String>,
        len: impl Into<Len>,
    ) -> Result<&mut Self, ParseError> {
        let n = len.into().resolve(&self.vars)?;
        let bytes = self.read(n);
        self.vars.set(name, bytes);
        Ok(self)
    }

    /// Advance past `len` bytes without storing them.
    ///
    /// # Errors
    ///
    /// Same as [`buffer`](Self::buffer).
    pub fn skip(&mut self, len: impl Into<Len>) -> Result<&mut Self, ParseError> {
        let n = len.into().resolve(&self.vars)?;
        self.read(n);
        Ok(self)
    }

    /// Run `f` against this parser, for conditional sub-structures.
    ///
    /// # Errors
    ///
    /// Propagates whatever `f` returns.
    pub fn tap<F>(&mut self, f: F) -> Result<&mut Self, ParseError>
    where
        F: FnOnce(&mut Self) -> Result<(), ParseError>,
    {
        f(self)?;
        Ok(self)
    }

    /// Run `f` repeatedly until it invokes the [`Terminator`].
    ///
    /// There is no iteration bound: a body that never terminates never
    /// returns, even once the region is exhausted.
    ///
    /// # Errors
    ///
    /// Stops at and propagates the first error from `f`.
    #[doc(alias = "loop")]
    pub fn repeat<F>(&mut self, mut f: F) -> Result<&mut Self, ParseError>
    where
        F: FnMut(&mut Self, &Terminator) -> Result<(), ParseError>,
    {
        let end = Terminator::new();
        while !end.is_terminated() {
            f(self, &end)?;
        }
        Ok(self)
    }

    /// Drop every stored variable. The cursor does not move.
    pub fn flush(&mut self) -> &mut Self {
        self.vars.clear();
        self
    }

    /// Advance to just past the next occurrence of `pattern`.
    ///
    /// `f` receives the bytes skipped before the match. Searching is
    /// bounded by [`ParserConfig::find_scan_limit`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::PatternNotFound`] if there is no match before
    /// the end of the region or within the scan limit; the cursor is left
    /// where it was. Otherwise propagates whatever `f` returns.
    pub fn find<F>(&mut self, pattern: impl AsRef<[u8]>, f: F) -> Result<&mut Self, ParseError>
    where
        F: FnOnce(&mut Self, Bytes) -> Result<(), ParseError>,
    {
        let pattern = pattern.as_ref();
        let haystack = &self.data[self.offset..];

        match find::scan(haystack, pattern, 0, self.config.find_scan_limit) {
            Scan::Found(at) => {
                let skipped = self.read(at);
                self.read(pattern.len());
                trace!(skipped = at, offset = self.offset, "find matched");
                f(self, skipped)?;
                Ok(self)
            }
            Scan::NeedMore { .. } => Err(ParseError::PatternNotFound {
                pattern: pattern.to_vec(),
                scanned: haystack.len(),
            }),
            Scan::GaveUp { scanned } => Err(ParseError::PatternNotFound {
                pattern: pattern.to_vec(),
                scanned,
            }),
        }
    }
}
